//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! A configuration file is optional; every field has a default and CLI flags
//! take precedence over the file.

pub mod cli;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub bank: BankConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Taboo search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Parallel tasks per search round
    #[serde(default = "default_tasks")]
    pub tasks: usize,
    /// Size of the random graph used when nothing better is available
    #[serde(default = "default_start_size")]
    pub start_size: usize,
    /// Stop once the working graph grows past this size (unbounded if unset)
    #[serde(default = "default_max_size")]
    pub max_size: Option<usize>,
    /// RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Where confirmed counterexamples are written
    #[serde(default = "default_counterexample_dir")]
    pub counterexample_dir: PathBuf,
}

fn default_tasks() -> usize {
    num_cpus::get()
}

fn default_start_size() -> usize {
    32
}

fn default_max_size() -> Option<usize> {
    Some(101)
}

fn default_counterexample_dir() -> PathBuf {
    PathBuf::from("counter-examples")
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tasks: default_tasks(),
            start_size: default_start_size(),
            max_size: default_max_size(),
            seed: None,
            counterexample_dir: default_counterexample_dir(),
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Address the sync listener binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Durable copy of the latest graph
    #[serde(default = "default_latest_path")]
    pub latest_path: PathBuf,
    /// Durable copy of the worker registry (in-memory only if unset)
    pub registry_path: Option<PathBuf>,
    /// Per-worker timeout for preemption pushes (milliseconds)
    #[serde(default = "default_push_timeout_ms")]
    pub push_timeout_ms: u64,
    /// Pending broadcasts beyond this are dropped
    #[serde(default = "default_broadcast_queue")]
    pub broadcast_queue: usize,
}

fn default_listen_addr() -> String {
    "0.0.0.0:6666".to_string()
}

fn default_latest_path() -> PathBuf {
    PathBuf::from("ce.state")
}

fn default_push_timeout_ms() -> u64 {
    10_000
}

fn default_broadcast_queue() -> usize {
    8
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            latest_path: default_latest_path(),
            registry_path: None,
            push_timeout_ms: default_push_timeout_ms(),
            broadcast_queue: default_broadcast_queue(),
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Coordinator sync address
    #[serde(default = "default_coordinator_addr")]
    pub coordinator_addr: String,
    /// Port the preemption listener binds to (0 picks a free port)
    #[serde(default = "default_preempt_port")]
    pub preempt_port: u16,
    /// Counterexample to start from, as a state file or adjacency text
    pub seed_graph: Option<PathBuf>,
}

fn default_coordinator_addr() -> String {
    "127.0.0.1:6666".to_string()
}

fn default_preempt_port() -> u16 {
    5555
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            coordinator_addr: default_coordinator_addr(),
            preempt_port: default_preempt_port(),
            seed_graph: None,
        }
    }
}

/// Solution bank configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankConfig {
    /// Offer confirmed counterexamples to the bank
    #[serde(default)]
    pub enabled: bool,
    /// Directory holding the externalized `.adj` files
    #[serde(default = "default_bank_dir")]
    pub dir: PathBuf,
    /// Bank state file, relative to `dir` unless absolute
    #[serde(default = "default_bank_state_file")]
    pub state_file: PathBuf,
    /// Isomorphism checker executable
    #[serde(default = "default_oracle")]
    pub oracle: PathBuf,
    /// Checker arguments; `{candidate}` and `{existing}` are replaced by file paths
    #[serde(default = "default_oracle_args")]
    pub oracle_args: Vec<String>,
    /// Vertex-deletion levels to harvest from each accepted graph
    #[serde(default)]
    pub harvest_levels: usize,
}

fn default_bank_dir() -> PathBuf {
    PathBuf::from("bank")
}

fn default_bank_state_file() -> PathBuf {
    PathBuf::from("bank.state")
}

fn default_oracle() -> PathBuf {
    PathBuf::from("./iso_check")
}

fn default_oracle_args() -> Vec<String> {
    ["-g", "{candidate}", "-f", "{existing}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl BankConfig {
    /// Resolved location of the bank state file.
    pub fn state_path(&self) -> PathBuf {
        if self.state_file.is_absolute() {
            self.state_file.clone()
        } else {
            self.dir.join(&self.state_file)
        }
    }
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_bank_dir(),
            state_file: default_bank_state_file(),
            oracle: default_oracle(),
            oracle_args: default_oracle_args(),
            harvest_levels: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.start_size, 32);
        assert_eq!(config.search.max_size, Some(101));
        assert!(config.search.tasks >= 1);
        assert_eq!(config.coordinator.listen_addr, "0.0.0.0:6666");
        assert_eq!(config.coordinator.broadcast_queue, 8);
        assert_eq!(config.worker.preempt_port, 5555);
        assert!(!config.bank.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bank_state_path() {
        let mut bank = BankConfig::default();
        assert_eq!(bank.state_path(), PathBuf::from("bank/bank.state"));
        bank.state_file = PathBuf::from("/var/lib/bank.state");
        assert_eq!(bank.state_path(), PathBuf::from("/var/lib/bank.state"));
    }
}
