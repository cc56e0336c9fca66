//! Periodic snapshotting of the live-cell projection to a PGM image
//! (spec.md §4.5), grounded in `write_snapshot` in
//! `examples/original_source/EX1/GoL_parallel_read_write.c`.
//!
//! Every rank computes its band's live-bit row buffer and ships it to
//! a designated root rank (the last rank, mirroring the reference
//! implementation's `size - 1`), which concatenates the bands in rank
//! order — they already tile the grid without gaps — and writes one
//! PGM file.

use std::path::{Path, PathBuf};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{GolError, Result};
use crate::pgm;

/// Builds one unbounded channel per rank, all delivering to the root.
/// `senders[r]` is handed to rank `r`; `receivers[r]` is read by the
/// root to collect rank `r`'s band.
pub fn build_snapshot_channels(ranks: usize) -> (Vec<Sender<Vec<u8>>>, Vec<Receiver<Vec<u8>>>) {
    let mut senders = Vec::with_capacity(ranks);
    let mut receivers = Vec::with_capacity(ranks);
    for _ in 0..ranks {
        let (sender, receiver) = unbounded();
        senders.push(sender);
        receivers.push(receiver);
    }
    (senders, receivers)
}

/// Reads one band from each receiver, in rank order, and writes the
/// concatenated `k`×`k` image to `path`.
pub fn gather_and_write(path: &Path, k: usize, receivers: &[Receiver<Vec<u8>>]) -> Result<()> {
    let mut pixels = Vec::with_capacity(k * k);
    for receiver in receivers {
        let band = receiver
            .recv()
            .map_err(|_| GolError::Protocol("snapshot channel closed before gather".into()))?;
        pixels.extend_from_slice(&band);
    }
    pgm::write_pgm(path, k, &pixels)
}

/// `{dir}/{basename}_NNNNN.pgm`, matching `write_snapshot`'s
/// `"%s_%05d.pgm"` filename convention.
pub fn snapshot_path(dir: &Path, basename: &str, iteration: u64) -> PathBuf {
    dir.join(format!("{basename}_{iteration:05}.pgm"))
}
