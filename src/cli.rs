//! Command-line surface (spec.md §6), implemented with `clap` derive
//! macros in place of the reference implementation's hand-rolled
//! `getopt` parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::EngineConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// `-e 0`
    #[value(name = "0", alias = "ordered")]
    Ordered,
    /// `-e 1`
    #[value(name = "1", alias = "static")]
    Static,
}

/// Clustered Conway's Game of Life.
#[derive(Parser, Debug)]
#[command(name = "life-cluster", version, about)]
pub struct Cli {
    /// Initialise a new random grid and write it to `--file`.
    #[arg(short = 'i', long = "init", conflicts_with = "run")]
    pub init: bool,

    /// Run an existing grid read from `--file`.
    #[arg(short = 'r', long = "run", conflicts_with = "init")]
    pub run: bool,

    /// Grid size (k×k).
    #[arg(short = 'k', long = "size")]
    pub k: usize,

    /// Evolution discipline: `0`/`ordered` or `1`/`static`.
    #[arg(short = 'e', long = "engine", value_enum, default_value = "static")]
    pub engine: EngineKind,

    /// PGM file path: read for `-r`, written for `-i`.
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Number of generations to run (ignored with `-i`).
    #[arg(short = 'n', long = "generations", default_value_t = 0)]
    pub generations: u64,

    /// Snapshot period; 0 means "only the final snapshot".
    #[arg(short = 's', long = "snapshot-period", default_value_t = 0)]
    pub snapshot_period: u64,

    /// Number of ranks to partition the grid across (default: the
    /// number of logical CPUs, clamped to `k`).
    #[arg(long = "ranks")]
    pub ranks: Option<usize>,

    /// Per-rank rayon thread pool size (default: rayon's own default).
    #[arg(long = "threads")]
    pub threads: Option<usize>,

    /// Directory periodic snapshots are written into.
    #[arg(long = "snapshot-dir", default_value = "./snapshots")]
    pub snapshot_dir: PathBuf,

    /// Run the ordered engine's advisory self-check every generation.
    #[arg(long = "check")]
    pub check: bool,

    /// Increase log verbosity (repeatable: `-v`, `-vv`, `-vvv`).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Ranks to partition the grid across, clamped to `k` and falling
    /// back to the logical CPU count.
    pub fn resolved_ranks(&self) -> usize {
        let ranks = self
            .ranks
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
        ranks.clamp(1, self.k.max(1))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_snapshot_dir(&self.snapshot_dir)
            .with_self_check(self.check)
    }

    /// Maps `-v` counts to a `tracing` filter directive, matching the
    /// teacher's own CLI verbosity convention.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
