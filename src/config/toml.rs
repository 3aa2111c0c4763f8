//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    // Search
    if let Some(tasks) = cli.tasks {
        config.search.tasks = tasks;
    }
    if let Some(start_size) = cli.start_size {
        config.search.start_size = start_size;
    }
    if cli.unbounded {
        config.search.max_size = None;
    } else if let Some(max_size) = cli.max_size {
        config.search.max_size = Some(max_size);
    }
    if let Some(seed) = cli.seed {
        config.search.seed = Some(seed);
    }
    if let Some(dir) = &cli.counterexample_dir {
        config.search.counterexample_dir = dir.clone();
    }

    // Coordinator
    if let Some(listen) = &cli.listen {
        config.coordinator.listen_addr = listen.clone();
    }
    if let Some(path) = &cli.latest_file {
        config.coordinator.latest_path = path.clone();
    }
    if let Some(path) = &cli.registry_file {
        config.coordinator.registry_path = Some(path.clone());
    }
    if let Some(timeout) = cli.push_timeout_ms {
        config.coordinator.push_timeout_ms = timeout;
    }

    // Worker
    if let Some(addr) = &cli.coordinator {
        config.worker.coordinator_addr = addr.clone();
    }
    if let Some(port) = cli.preempt_port {
        config.worker.preempt_port = port;
    }
    if let Some(path) = &cli.seed_graph {
        config.worker.seed_graph = Some(path.clone());
    }

    // Bank
    if cli.bank {
        config.bank.enabled = true;
    }
    if let Some(dir) = &cli.bank_dir {
        config.bank.dir = dir.clone();
    }
    if let Some(oracle) = &cli.oracle {
        config.bank.oracle = oracle.clone();
    }
    if let Some(levels) = cli.harvest {
        config.bank.harvest_levels = levels;
    }

    // Logging
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    config
}

/// Build the effective configuration: file (if any), then CLI overrides, then validation.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    let config = merge_cli_with_config(cli, config);
    super::validator::validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let config = parse_toml_string(
            r#"
            [search]
            tasks = 4
            start_size = 17

            [coordinator]
            registry_path = "registry.state"

            [bank]
            enabled = true
            oracle_args = ["{candidate}", "{existing}"]
            "#,
        )
        .unwrap();

        assert_eq!(config.search.tasks, 4);
        assert_eq!(config.search.start_size, 17);
        assert_eq!(config.search.max_size, Some(101));
        assert_eq!(config.coordinator.registry_path, Some(PathBuf::from("registry.state")));
        assert_eq!(config.coordinator.listen_addr, "0.0.0.0:6666");
        assert!(config.bank.enabled);
        assert_eq!(config.bank.oracle_args, vec!["{candidate}", "{existing}"]);
        assert_eq!(config.worker.coordinator_addr, "127.0.0.1:6666");
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = parse_toml_string("").unwrap();
        assert_eq!(config.search.start_size, 32);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        assert!(parse_toml_string("[search]\ntasks = \"many\"\n").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let config = parse_toml_string("[search]\ntasks = 4\nseed = 1\n").unwrap();
        let cli = Cli::parse_from([
            "ramsey-miner",
            "--tasks",
            "8",
            "--unbounded",
            "--coordinator",
            "10.0.0.5:6666",
            "--bank",
        ]);
        let merged = merge_cli_with_config(&cli, config);
        assert_eq!(merged.search.tasks, 8);
        assert_eq!(merged.search.seed, Some(1));
        assert_eq!(merged.search.max_size, None);
        assert_eq!(merged.worker.coordinator_addr, "10.0.0.5:6666");
        assert!(merged.bank.enabled);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miner.toml");
        fs::write(&path, "[worker]\npreempt_port = 7000\n").unwrap();

        let cli = Cli::parse_from(["ramsey-miner", "--config", path.to_str().unwrap()]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.worker.preempt_port, 7000);

        let cli = Cli::parse_from(["ramsey-miner", "--config", "/nonexistent/miner.toml"]);
        assert!(load_config(&cli).is_err());
    }
}
