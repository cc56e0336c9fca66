//! Halo-exchange ring transport (spec.md §4.2).
//!
//! The reference implementation posts non-blocking MPI sends/receives
//! for the top and bottom ghost rows and waits on them before the next
//! generation reads the ghosts. `crossbeam-channel` plays the role MPI
//! plays here: one bounded(1) channel per rank per direction, wired
//! into a ring by [`build_ring`].

use crossbeam_channel::{bounded, Receiver, Sender};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// A previously-posted send, to be [`RingLink::wait_send`]ed before a
/// second send in the same direction is posted.
pub struct SendHandle {
    direction: Direction,
}

/// A previously-posted receive, to be [`RingLink::wait_recv`]ed to
/// obtain the row it carries.
pub struct RecvHandle {
    direction: Direction,
}

/// Halo exchange over a ring, one link per rank. Exactly one send may
/// be outstanding per direction at a time — posting a second before
/// the first is waited on is a protocol error.
pub trait RingLink {
    /// Sends `row` to this rank's up-neighbour (its top owned row,
    /// consumed there as the bottom ghost).
    fn post_send_up(&mut self, row: Vec<u8>) -> SendHandle;
    /// Sends `row` to this rank's down-neighbour (its bottom owned
    /// row, consumed there as the top ghost).
    fn post_send_down(&mut self, row: Vec<u8>) -> SendHandle;
    /// Begins receiving this rank's top ghost, sent by the up-neighbour.
    fn post_recv_up(&mut self) -> RecvHandle;
    /// Begins receiving this rank's bottom ghost, sent by the
    /// down-neighbour.
    fn post_recv_down(&mut self) -> RecvHandle;

    fn wait_send(&mut self, handle: SendHandle);
    fn wait_recv(&mut self, handle: RecvHandle) -> Vec<u8>;
}

/// A `RingLink` backed by `crossbeam-channel`. Built in a batch by
/// [`build_ring`] so that every rank's senders and receivers are wired
/// to the correct neighbours.
pub struct ChannelRingLink {
    send_up: Sender<Vec<u8>>,
    send_down: Sender<Vec<u8>>,
    recv_up: Receiver<Vec<u8>>,
    recv_down: Receiver<Vec<u8>>,
    outstanding_send_up: bool,
    outstanding_send_down: bool,
}

impl RingLink for ChannelRingLink {
    fn post_send_up(&mut self, row: Vec<u8>) -> SendHandle {
        debug_assert!(
            !self.outstanding_send_up,
            "post_send_up called with a send already outstanding"
        );
        self.outstanding_send_up = true;
        self.send_up
            .send(row)
            .expect("up-neighbour channel disconnected");
        SendHandle { direction: Direction::Up }
    }

    fn post_send_down(&mut self, row: Vec<u8>) -> SendHandle {
        debug_assert!(
            !self.outstanding_send_down,
            "post_send_down called with a send already outstanding"
        );
        self.outstanding_send_down = true;
        self.send_down
            .send(row)
            .expect("down-neighbour channel disconnected");
        SendHandle { direction: Direction::Down }
    }

    fn post_recv_up(&mut self) -> RecvHandle {
        RecvHandle { direction: Direction::Up }
    }

    fn post_recv_down(&mut self) -> RecvHandle {
        RecvHandle { direction: Direction::Down }
    }

    fn wait_send(&mut self, handle: SendHandle) {
        match handle.direction {
            Direction::Up => self.outstanding_send_up = false,
            Direction::Down => self.outstanding_send_down = false,
        }
    }

    fn wait_recv(&mut self, handle: RecvHandle) -> Vec<u8> {
        let receiver = match handle.direction {
            Direction::Up => &self.recv_up,
            Direction::Down => &self.recv_down,
        };
        receiver.recv().expect("neighbour channel disconnected")
    }
}

/// Wires `ranks` `ChannelRingLink`s into a ring: rank `r`'s
/// `post_send_up` delivers to rank `r - 1`'s `post_recv_down`, and its
/// `post_send_down` delivers to rank `r + 1`'s `post_recv_up`
/// (indices modulo `ranks`).
pub fn build_ring(ranks: usize) -> Vec<ChannelRingLink> {
    assert!(ranks >= 1, "a ring needs at least one rank");

    // up_channels[i]: rank i's post_send_up traffic.
    // down_channels[i]: rank i's post_send_down traffic.
    let up_channels: Vec<(Sender<Vec<u8>>, Receiver<Vec<u8>>)> =
        (0..ranks).map(|_| bounded(1)).collect();
    let down_channels: Vec<(Sender<Vec<u8>>, Receiver<Vec<u8>>)> =
        (0..ranks).map(|_| bounded(1)).collect();

    (0..ranks)
        .map(|r| {
            let up_neighbor = if r == 0 { ranks - 1 } else { r - 1 };
            let down_neighbor = if r == ranks - 1 { 0 } else { r + 1 };
            ChannelRingLink {
                send_up: up_channels[r].0.clone(),
                send_down: down_channels[r].0.clone(),
                recv_up: down_channels[up_neighbor].1.clone(),
                recv_down: up_channels[down_neighbor].1.clone(),
                outstanding_send_up: false,
                outstanding_send_down: false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn single_rank_ring_loops_back_to_itself() {
        let mut links = build_ring(1);
        let mut link = links.remove(0);
        let send = link.post_send_up(vec![1, 2, 3]);
        let recv = link.post_recv_down();
        link.wait_send(send);
        assert_eq!(link.wait_recv(recv), vec![1, 2, 3]);
    }

    #[test]
    fn three_rank_ring_exchanges_both_directions() {
        let links = build_ring(3);
        let mut handles = Vec::new();
        for (rank, mut link) in links.into_iter().enumerate() {
            handles.push(thread::spawn(move || {
                let top_row = vec![rank as u8; 4];
                let bottom_row = vec![rank as u8 + 100; 4];
                let send_up = link.post_send_up(top_row);
                let send_down = link.post_send_down(bottom_row);
                let recv_up = link.post_recv_up();
                let recv_down = link.post_recv_down();
                link.wait_send(send_up);
                link.wait_send(send_down);
                let from_up = link.wait_recv(recv_up);
                let from_down = link.wait_recv(recv_down);
                (rank, from_up, from_down)
            }));
        }

        let mut results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort_by_key(|(rank, _, _)| *rank);

        for (rank, from_up, from_down) in results {
            let up_neighbor = if rank == 0 { 2 } else { rank - 1 };
            let down_neighbor = if rank == 2 { 0 } else { rank + 1 };
            assert_eq!(from_up, vec![up_neighbor as u8 + 100; 4]);
            assert_eq!(from_down, vec![down_neighbor as u8; 4]);
        }
    }
}
