pub mod band;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod partition;
pub mod pgm;
pub mod snapshot;
pub mod transport;

pub use config::EngineConfig;
pub use error::{GolError, Result};
