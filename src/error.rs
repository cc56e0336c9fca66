//! Error types shared across the crate.
//!
//! Mirrors the three externally-visible failure classes from the error
//! handling design: configuration, I/O and protocol. Invariant violations
//! (the ordered engine's advisory self-check) are logged, not raised, and
//! so have no variant here.

use std::path::PathBuf;

/// Top-level error type returned by library code.
#[derive(thiserror::Error, Debug)]
pub enum GolError {
    /// Bad CLI input or a partition that cannot be realised (e.g. `k < 1`).
    #[error("configuration error: {0}")]
    Config(String),

    /// PGM open/parse/read/write failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Halo or ring-transport misuse: tag mismatch, length mismatch, a
    /// second send posted before the first was awaited, a missing
    /// bootstrap handshake.
    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, GolError>;

impl GolError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
