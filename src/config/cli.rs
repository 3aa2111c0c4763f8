//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Search node: syncs with a coordinator and accepts preemptions (default)
    Worker,
    /// Coordinator: tracks the largest counterexample and pushes it to workers
    Coordinator,
    /// Local search with no coordinator
    Search,
    /// Offer graph files to the solution bank
    Bank,
    /// Query a running coordinator
    Status,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionMode::Worker => "worker",
            ExecutionMode::Coordinator => "coordinator",
            ExecutionMode::Search => "search",
            ExecutionMode::Bank => "bank",
            ExecutionMode::Status => "status",
        };
        f.write_str(name)
    }
}

/// Output format for reports printed to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// ramsey-miner - distributed search for R(6,6) counterexamples
#[derive(Parser, Debug)]
#[command(name = "ramsey-miner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: worker, coordinator, search, bank, or status
    #[arg(long, value_enum, default_value = "worker")]
    pub mode: ExecutionMode,

    /// TOML configuration file
    #[arg(short = 'c', long, env = "RAMSEY_MINER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Graph files to offer to the bank (bank mode only)
    #[arg(value_name = "GRAPH")]
    pub inputs: Vec<PathBuf>,

    // === Coordinator ===
    /// Address for the coordinator to listen on (e.g., 0.0.0.0:6666)
    #[arg(long)]
    pub listen: Option<String>,

    /// Latest-graph state file (coordinator mode)
    #[arg(long)]
    pub latest_file: Option<PathBuf>,

    /// Registry state file (coordinator mode)
    #[arg(long)]
    pub registry_file: Option<PathBuf>,

    /// Preemption push timeout in milliseconds (coordinator mode)
    #[arg(long)]
    pub push_timeout_ms: Option<u64>,

    // === Worker ===
    /// Coordinator address (worker and status modes)
    #[arg(long, env = "RAMSEY_MINER_COORDINATOR")]
    pub coordinator: Option<String>,

    /// Port for the preemption listener (worker mode)
    #[arg(long)]
    pub preempt_port: Option<u16>,

    /// Counterexample to start from (state file or adjacency text)
    #[arg(long)]
    pub seed_graph: Option<PathBuf>,

    // === Search ===
    /// Parallel tasks per search round
    #[arg(short = 't', long)]
    pub tasks: Option<usize>,

    /// Size of the initial random graph
    #[arg(long)]
    pub start_size: Option<usize>,

    /// Stop after growing past this size
    #[arg(long, conflicts_with = "unbounded")]
    pub max_size: Option<usize>,

    /// Never stop growing
    #[arg(long)]
    pub unbounded: bool,

    /// RNG seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for confirmed counterexamples
    #[arg(long)]
    pub counterexample_dir: Option<PathBuf>,

    // === Bank ===
    /// Offer confirmed counterexamples to the solution bank
    #[arg(long)]
    pub bank: bool,

    /// Solution bank directory
    #[arg(long)]
    pub bank_dir: Option<PathBuf>,

    /// Isomorphism checker executable
    #[arg(long)]
    pub oracle: Option<PathBuf>,

    /// Vertex-deletion levels to harvest from accepted graphs
    #[arg(long)]
    pub harvest: Option<usize>,

    // === Output ===
    /// Report format (status and bank modes)
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Log filter (e.g., info, debug, ramsey_miner=trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mode == ExecutionMode::Bank && self.inputs.is_empty() {
            anyhow::bail!("bank mode needs at least one graph file");
        }
        if self.mode != ExecutionMode::Bank && !self.inputs.is_empty() {
            anyhow::bail!("graph files are only accepted in bank mode");
        }

        if self.tasks == Some(0) {
            anyhow::bail!("tasks must be at least 1");
        }

        if let (Some(start), Some(max)) = (self.start_size, self.max_size) {
            if max < start {
                anyhow::bail!("max_size ({}) must be at least start_size ({})", max, start);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ramsey-miner").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_mode_is_worker() {
        let cli = parse(&[]);
        assert_eq!(cli.mode, ExecutionMode::Worker);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_bank_mode_needs_inputs() {
        assert!(parse(&["--mode", "bank"]).validate().is_err());
        let cli = parse(&["--mode", "bank", "a.adj", "b.adj"]);
        assert_eq!(cli.inputs.len(), 2);
        assert!(cli.validate().is_ok());
        assert!(parse(&["--mode", "search", "a.adj"]).validate().is_err());
    }

    #[test]
    fn test_validate_sizes_and_tasks() {
        assert!(parse(&["-t", "0"]).validate().is_err());
        assert!(parse(&["--start-size", "40", "--max-size", "30"]).validate().is_err());
        assert!(parse(&["--start-size", "30", "--max-size", "40"]).validate().is_ok());
    }

    #[test]
    fn test_unbounded_conflicts_with_max_size() {
        let args = ["ramsey-miner", "--unbounded", "--max-size", "50"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
