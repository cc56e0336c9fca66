use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use life_cluster::cli::{Cli, EngineKind};
use life_cluster::cluster::{self, ClusterConfig};
use life_cluster::domain::rule::ConwayRule;
use life_cluster::pgm;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    install_logging(&cli);

    if cli.init {
        return run_init(&cli);
    }
    if cli.run {
        return run_simulation(&cli);
    }
    anyhow::bail!("exactly one of -i/--init or -r/--run must be given");
}

fn install_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_init(cli: &Cli) -> anyhow::Result<()> {
    let mut rng = rand::rng();
    cluster::write_initial_grid(&cli.file, cli.k, &mut rng)
        .with_context(|| format!("writing initial grid to {}", cli.file.display()))?;
    tracing::info!(k = cli.k, path = %cli.file.display(), "wrote initial grid");
    Ok(())
}

fn run_simulation(cli: &Cli) -> anyhow::Result<()> {
    let (k, initial) = pgm::read_pgm(&cli.file)
        .with_context(|| format!("reading grid from {}", cli.file.display()))?;
    anyhow::ensure!(k == cli.k, "-k {} does not match the {k}x{k} grid in {}", cli.k, cli.file.display());

    let config = ClusterConfig {
        k,
        ranks: cli.resolved_ranks(),
        threads: cli.threads,
        generations: cli.generations,
        snapshot_period: cli.snapshot_period,
        snapshot_dir: cli.snapshot_dir.clone(),
        engine: cli.engine_config(),
    };
    tracing::info!(
        k = config.k,
        ranks = config.ranks,
        generations = config.generations,
        engine = ?cli.engine,
        "starting run"
    );

    match cli.engine {
        EngineKind::Static => cluster::run_static(&config, ConwayRule, &initial)?,
        EngineKind::Ordered => cluster::run_ordered(&config, &initial)?,
    }
    Ok(())
}
