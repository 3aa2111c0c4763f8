//! Configuration validation

use super::*;
use crate::graph::CLIQUE_SIZE;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_search(&config.search)?;
    validate_coordinator(&config.coordinator)?;
    validate_worker(&config.worker)?;
    validate_bank(&config.bank)?;
    validate_logging(&config.logging)?;

    Ok(())
}

/// Validate search configuration
pub fn validate_search(search: &SearchConfig) -> Result<()> {
    if search.tasks == 0 {
        anyhow::bail!("search.tasks must be at least 1");
    }

    if search.start_size < CLIQUE_SIZE {
        anyhow::bail!(
            "search.start_size must be at least {}, got {}",
            CLIQUE_SIZE,
            search.start_size
        );
    }

    if let Some(max) = search.max_size {
        if max < search.start_size {
            anyhow::bail!(
                "search.max_size ({}) must be at least search.start_size ({})",
                max,
                search.start_size
            );
        }
    }

    Ok(())
}

/// Validate coordinator configuration
pub fn validate_coordinator(coordinator: &CoordinatorConfig) -> Result<()> {
    coordinator
        .listen_addr
        .parse::<SocketAddr>()
        .with_context(|| format!("coordinator.listen_addr is not a socket address: {}", coordinator.listen_addr))?;

    if coordinator.push_timeout_ms == 0 {
        anyhow::bail!("coordinator.push_timeout_ms must be greater than 0");
    }

    if coordinator.broadcast_queue == 0 {
        anyhow::bail!("coordinator.broadcast_queue must be at least 1");
    }

    Ok(())
}

/// Validate worker configuration
pub fn validate_worker(worker: &WorkerConfig) -> Result<()> {
    if worker.coordinator_addr.trim().is_empty() {
        anyhow::bail!("worker.coordinator_addr must not be empty");
    }

    Ok(())
}

/// Validate bank configuration
pub fn validate_bank(bank: &BankConfig) -> Result<()> {
    let has = |placeholder: &str| bank.oracle_args.iter().any(|arg| arg.contains(placeholder));
    if !has("{candidate}") || !has("{existing}") {
        anyhow::bail!("bank.oracle_args must reference both {{candidate}} and {{existing}}");
    }

    Ok(())
}

/// Validate logging configuration
pub fn validate_logging(logging: &LoggingConfig) -> Result<()> {
    EnvFilter::try_new(&logging.level)
        .with_context(|| format!("logging.level is not a valid filter: {}", logging.level))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_search_limits() {
        let mut search = SearchConfig::default();
        search.start_size = 5;
        assert!(validate_search(&search).is_err());

        search.start_size = 40;
        search.max_size = Some(39);
        assert!(validate_search(&search).is_err());

        search.max_size = None;
        assert!(validate_search(&search).is_ok());

        search.tasks = 0;
        assert!(validate_search(&search).is_err());
    }

    #[test]
    fn test_coordinator_address() {
        let mut coordinator = CoordinatorConfig::default();
        coordinator.listen_addr = "not-an-address".to_string();
        assert!(validate_coordinator(&coordinator).is_err());

        coordinator.listen_addr = "127.0.0.1:0".to_string();
        coordinator.broadcast_queue = 0;
        assert!(validate_coordinator(&coordinator).is_err());
    }

    #[test]
    fn test_oracle_args_need_placeholders() {
        let mut bank = BankConfig::default();
        bank.oracle_args = vec!["-g".to_string(), "{candidate}".to_string()];
        assert!(validate_bank(&bank).is_err());
    }

    #[test]
    fn test_logging_filter() {
        let logging = LoggingConfig {
            level: "ramsey_miner=debug,warn".to_string(),
        };
        assert!(validate_logging(&logging).is_ok());
    }
}
