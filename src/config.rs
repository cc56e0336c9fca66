//! Engine configuration values.
//!
//! Per the spec's redesign note, constants that the reference C
//! implementation bakes in as process-wide `#define`s (`stride`,
//! `header_size`, snapshot directory) are injected here at
//! construction time instead.

use std::path::{Path, PathBuf};

/// Minimum fragment width, in columns, used by the ordered engine's
/// line-independent decomposition (spec.md §4.4). Chosen to be at
/// least twice a cache line to avoid false sharing between threads
/// updating adjacent fragments.
pub const DEFAULT_STRIDE: usize = 128;

/// Byte length of the fixed-format PGM header `"P5\n%8d %8d\n%d\n"`.
pub const PGM_HEADER_SIZE: usize = 23;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Minimum ordered-engine fragment width, in columns.
    pub stride: usize,
    /// PGM header size in bytes, used to compute per-rank file offsets.
    pub header_size: usize,
    /// Directory periodic snapshots are written into.
    pub snapshot_dir: PathBuf,
    /// Run the ordered engine's advisory self-check every generation.
    pub self_check: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            header_size: PGM_HEADER_SIZE,
            snapshot_dir: PathBuf::from("./snapshots"),
            self_check: false,
        }
    }
}

impl EngineConfig {
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_snapshot_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.snapshot_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_self_check(mut self, enabled: bool) -> Self {
        self.self_check = enabled;
        self
    }
}
