//! ramsey-miner CLI entry point

use anyhow::{Context, Result};
use ramsey_miner::bank::SolutionBank;
use ramsey_miner::config::cli::{Cli, ExecutionMode, OutputFormat};
use ramsey_miner::config::toml::load_config;
use ramsey_miner::config::Config;
use ramsey_miner::distributed::{protocol, Coordinator, WorkerAgent};
use ramsey_miner::graph::read_graph_file;
use ramsey_miner::output;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;
    let config = load_config(&cli)?;

    init_logging(&config);
    info!(version = env!("CARGO_PKG_VERSION"), mode = %cli.mode, "ramsey-miner starting");

    match cli.mode {
        ExecutionMode::Worker => run_worker(config),
        ExecutionMode::Coordinator => run_coordinator(config),
        ExecutionMode::Search => run_search(config),
        ExecutionMode::Bank => run_bank(config, &cli),
        ExecutionMode::Status => run_status(config, cli.format),
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create tokio runtime")
}

/// Search and sync with the coordinator
fn run_worker(config: Config) -> Result<()> {
    let runtime = runtime()?;
    let result = runtime.block_on(async {
        let agent = WorkerAgent::new(config).context("Failed to create worker")?;
        agent.run().await
    });
    // A search round may still be running on a blocking thread.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

/// Search on this machine only
fn run_search(config: Config) -> Result<()> {
    let runtime = runtime()?;
    let result = runtime.block_on(async {
        let agent = WorkerAgent::standalone(config).context("Failed to create search")?;
        agent.run().await
    });
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

/// Serve syncs and status requests until Ctrl-C
fn run_coordinator(config: Config) -> Result<()> {
    let runtime = runtime()?;
    runtime.block_on(async {
        let coordinator = Coordinator::new(config.coordinator)
            .context("Failed to create coordinator")?;
        coordinator.run().await
    })
}

/// Offer graph files to the solution bank and print its contents
fn run_bank(config: Config, cli: &Cli) -> Result<()> {
    let mut bank = SolutionBank::from_config(&config.bank)?;
    let levels = config.bank.harvest_levels;

    let mut accepted = 0;
    for path in &cli.inputs {
        let graph = read_graph_file(path)?;
        if !graph.is_counterexample() {
            warn!(path = %path.display(), size = graph.size(), "Not a counterexample, skipping");
            continue;
        }
        if bank.add_coin(&graph)? {
            accepted += 1;
            if levels > 0 {
                bank.harvest(&graph, levels)?;
            }
        } else {
            info!(path = %path.display(), "Already banked");
        }
    }
    info!(offered = cli.inputs.len(), accepted, "Bank updated");

    output::print_bank_summary(bank.dir(), &bank.summary(), cli.format)
}

/// Ask the coordinator for its status
fn run_status(config: Config, format: OutputFormat) -> Result<()> {
    let runtime = runtime()?;
    let report = runtime.block_on(protocol::status(&config.worker.coordinator_addr))?;
    output::print_status(&report, format)
}
