//! The static evolution engine (spec.md §4.3): synchronous,
//! double-buffered, generic over the birth/survival rule.
//!
//! Parallelism follows the teacher's `BitGrid::evolve_parallel`
//! pattern (`examples/AsmirZukic-game_of_life/src/domain/bit_grid.rs`):
//! read the whole band immutably, compute each row's next generation
//! in parallel, then apply the results in one sequential pass. This
//! sidesteps needing unsafe aliasing to mutate a cell while neighbours
//! are still reading its *other* parity bit.

use rayon::prelude::*;

use crate::band::BandGrid;
use crate::domain::rule::Rule;
use crate::domain::static_cell::StaticCell;
use crate::domain::torus::{left_move, right_move, wrap_add};

/// Minimum number of rows handed to a single rayon task, the nearest
/// stand-in for OpenMP's `schedule(guided)` granularity without a
/// dedicated work-stealing runtime (SPEC_FULL.md §4.3).
const MIN_ROWS_PER_CHUNK: usize = 3;

pub struct StaticEngine<R: Rule> {
    rule: R,
}

impl<R: Rule> StaticEngine<R> {
    pub fn new(rule: R) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    /// Advances `band` from `generation` to `generation + 1` in place.
    /// Ghost rows must already hold the neighbour ranks' edge rows for
    /// `generation` (see [`crate::transport::RingLink`]).
    pub fn step(&self, band: &mut BandGrid<StaticCell>, generation: u64) {
        let rows = band.rows();
        let cols = band.cols();
        if rows == 0 {
            return;
        }
        let threads = rayon::current_num_threads().max(1);
        let rows_per_chunk = (rows / threads).max(MIN_ROWS_PER_CHUNK);

        let row_range: Vec<usize> = (0..rows).collect();
        let next_rows: Vec<Vec<bool>> = row_range
            .par_chunks(rows_per_chunk)
            .flat_map(|chunk| {
                chunk
                    .par_iter()
                    .map(|&row| self.evolve_row(band, row, cols, generation))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (row, new_row) in next_rows.into_iter().enumerate() {
            for (col, alive) in new_row.into_iter().enumerate() {
                let mut cell = band.get(row, col);
                cell.set(generation + 1, alive);
                band.set(row, col, cell);
            }
        }
    }

    fn evolve_row(
        &self,
        band: &BandGrid<StaticCell>,
        row: usize,
        cols: usize,
        generation: u64,
    ) -> Vec<bool> {
        (0..cols)
            .map(|col| {
                let neighbors = self.count_neighbors(band, row, col, cols, generation);
                let alive = band.get(row, col).get(generation);
                self.rule.evolve(alive, neighbors)
            })
            .collect()
    }

    fn count_neighbors(
        &self,
        band: &BandGrid<StaticCell>,
        row: usize,
        col: usize,
        cols: usize,
        generation: u64,
    ) -> u8 {
        let left = wrap_add(col, left_move(col, cols), cols);
        let right = wrap_add(col, right_move(col, cols), cols);
        let mut count = 0u8;
        for dr in [-1isize, 0, 1] {
            let neighbor_row = band.row_including_ghosts(row as isize + dr);
            for &c in &[left, col, right] {
                if dr == 0 && c == col {
                    continue;
                }
                if neighbor_row[c].get(generation) {
                    count += 1;
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::ConwayRule;
    use crate::partition::Partitioner;

    fn single_rank_band(k: usize) -> BandGrid<StaticCell> {
        let meta = Partitioner::new(k, 1).unwrap().band(0).unwrap();
        BandGrid::new(meta)
    }

    fn seed(band: &mut BandGrid<StaticCell>, cells: &[(usize, usize)], generation: u64) {
        for &(row, col) in cells {
            let mut cell = band.get(row, col);
            cell.set(generation, true);
            band.set(row, col, cell);
        }
    }

    fn sync_self_ghosts(band: &mut BandGrid<StaticCell>) {
        let cols = band.cols();
        let rows = band.rows();
        for col in 0..cols {
            band.ghost_top_mut()[col] = band.get(rows - 1, col);
            band.ghost_bottom_mut()[col] = band.get(0, col);
        }
    }

    #[test]
    fn blinker_oscillates_with_period_two() {
        let k = 5;
        let mut band = single_rank_band(k);
        seed(&mut band, &[(2, 1), (2, 2), (2, 3)], 0);
        sync_self_ghosts(&mut band);
        let engine = StaticEngine::new(ConwayRule);

        engine.step(&mut band, 0);
        assert!(band.get(1, 2).get(1));
        assert!(band.get(3, 2).get(1));
        assert!(!band.get(2, 1).get(1));
        assert!(!band.get(2, 3).get(1));

        sync_self_ghosts(&mut band);
        engine.step(&mut band, 1);
        assert!(band.get(2, 1).get(2));
        assert!(band.get(2, 2).get(2));
        assert!(band.get(2, 3).get(2));
    }

    #[test]
    fn all_dead_grid_stays_dead() {
        let mut band = single_rank_band(6);
        sync_self_ghosts(&mut band);
        let engine = StaticEngine::new(ConwayRule);
        engine.step(&mut band, 0);
        for row in 0..6 {
            for col in 0..6 {
                assert!(!band.get(row, col).get(1));
            }
        }
    }

    #[test]
    fn single_live_cell_dies_from_isolation() {
        let mut band = single_rank_band(4);
        seed(&mut band, &[(1, 1)], 0);
        sync_self_ghosts(&mut band);
        let engine = StaticEngine::new(ConwayRule);
        engine.step(&mut band, 0);
        assert!(!band.get(1, 1).get(1));
    }
}
