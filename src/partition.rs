//! Row-band partitioning of a k×k grid across a cluster of ranks
//! (spec.md §4.1), grounded in the reference implementation's
//! `chunk`/`mod`/`my_chunk`/`my_first` arithmetic in
//! `examples/original_source/EX1/GoL_parallel_main.c`.

use crate::error::{GolError, Result};

/// One rank's share of the grid: a contiguous, non-overlapping band of
/// rows, plus the ring neighbours it exchanges halos with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Band {
    pub rank: usize,
    pub ranks: usize,
    /// Number of rows this rank owns (excludes ghost rows).
    pub rows: usize,
    /// Row index, in the full k×k grid, of this band's first owned row.
    pub first_row: usize,
    pub k: usize,
}

impl Band {
    #[inline]
    pub fn last_row(&self) -> usize {
        self.first_row + self.rows - 1
    }

    /// The rank whose band lies immediately above this one on the ring
    /// (wrapping from rank 0 to `ranks - 1`).
    #[inline]
    pub fn up_neighbor(&self) -> usize {
        if self.rank == 0 { self.ranks - 1 } else { self.rank - 1 }
    }

    /// The rank whose band lies immediately below this one on the ring
    /// (wrapping from `ranks - 1` to rank 0).
    #[inline]
    pub fn down_neighbor(&self) -> usize {
        if self.rank == self.ranks - 1 { 0 } else { self.rank + 1 }
    }

    /// Byte offset into a PGM P5 data section (after the fixed-size
    /// header) at which this band's first row begins, given `header_size`
    /// and the image's row stride in bytes (one byte per pixel).
    #[inline]
    pub fn file_offset(&self, header_size: usize) -> u64 {
        (header_size + self.first_row * self.k) as u64
    }
}

/// Splits a k×k grid into `ranks` horizontal bands as evenly as
/// possible: the first `k % ranks` ranks get one extra row, mirroring
/// the C source's `my_chunk = chunk + (rank < mod ? 1 : 0)`.
#[derive(Clone, Copy, Debug)]
pub struct Partitioner {
    pub k: usize,
    pub ranks: usize,
}

impl Partitioner {
    pub fn new(k: usize, ranks: usize) -> Result<Self> {
        if k == 0 {
            return Err(GolError::Config("grid size k must be at least 1".into()));
        }
        if ranks == 0 {
            return Err(GolError::Config("at least one rank is required".into()));
        }
        if ranks > k {
            return Err(GolError::Config(format!(
                "cannot partition a {k}-row grid across {ranks} ranks: each rank needs at least one row"
            )));
        }
        Ok(Self { k, ranks })
    }

    /// The band owned by `rank`.
    pub fn band(&self, rank: usize) -> Result<Band> {
        if rank >= self.ranks {
            return Err(GolError::Config(format!(
                "rank {rank} out of range for a {}-rank cluster",
                self.ranks
            )));
        }
        let chunk = self.k / self.ranks;
        let remainder = self.k % self.ranks;
        let rows = chunk + usize::from(rank < remainder);
        let first_row = rank * chunk + rank.min(remainder);
        if rows < 1 {
            return Err(GolError::Config(format!(
                "rank {rank} was assigned zero rows; reduce --ranks"
            )));
        }
        Ok(Band { rank, ranks: self.ranks, rows, first_row, k: self.k })
    }

    /// All bands, in rank order. Their row ranges tile `0..k` exactly:
    /// no gaps, no overlaps.
    pub fn all_bands(&self) -> Result<Vec<Band>> {
        (0..self.ranks).map(|rank| self.band(rank)).collect()
    }
}
