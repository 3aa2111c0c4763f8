//! Worker agent
//!
//! Drives a [`SearchDriver`] and keeps it in step with the coordinator:
//!
//! - Syncs once at startup and after every counterexample it finds
//! - Parks coordinator pushes in a [`PreemptSignal`] and resyncs between rounds
//! - Saves every counterexample to `ce<Size>.state` and offers it to the bank
//!
//! Only confirmed counterexamples are ever reported upstream. If the
//! coordinator is unreachable the agent keeps searching locally. Without a
//! coordinator address the agent runs standalone.

use crate::bank::{ExternalOracle, SolutionBank};
use crate::config::Config;
use crate::distributed::preempt::{serve_preemptions, PreemptSignal};
use crate::distributed::{node_id, protocol, shutdown_signal};
use crate::graph::{read_graph_file, Graph};
use crate::search::{SearchDriver, StepEvent};
use crate::util::persist::save_state;
use crate::util::time::{calculate_rate, format_duration, format_rate};
use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Rounds between progress lines.
const PROGRESS_INTERVAL: u64 = 1000;

/// Location of the saved counterexample for `size`.
pub fn counterexample_path(dir: &Path, size: usize) -> PathBuf {
    dir.join(format!("ce{size}.state"))
}

pub struct WorkerAgent {
    config: Config,
    node_id: String,
    /// `None` for standalone search
    coordinator: Option<String>,
    signal: Arc<PreemptSignal>,
    preempt_port: u16,
    confirmed: Option<Graph>,
    bank: Option<SolutionBank<ExternalOracle>>,
}

impl WorkerAgent {
    /// Agent that syncs with `config.worker.coordinator_addr`.
    pub fn new(config: Config) -> Result<Self> {
        let coordinator = Some(config.worker.coordinator_addr.clone());
        Self::build(config, coordinator)
    }

    /// Agent that searches without a coordinator.
    pub fn standalone(config: Config) -> Result<Self> {
        Self::build(config, None)
    }

    fn build(config: Config, coordinator: Option<String>) -> Result<Self> {
        let bank = if config.bank.enabled {
            Some(SolutionBank::from_config(&config.bank)?)
        } else {
            None
        };
        Ok(Self {
            node_id: node_id(),
            coordinator,
            signal: Arc::new(PreemptSignal::new()),
            preempt_port: config.worker.preempt_port,
            confirmed: None,
            bank,
            config,
        })
    }

    /// Largest counterexample this agent has confirmed.
    pub fn confirmed(&self) -> Option<&Graph> {
        self.confirmed.as_ref()
    }

    /// Run until the maximum size is reached or Ctrl-C.
    pub async fn run(self) -> Result<()> {
        if self.coordinator.is_none() {
            return self.run_until(None, shutdown_signal()).await;
        }
        let port = self.config.worker.preempt_port;
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("Failed to bind preemption listener on port {port}"))?;
        self.run_until(Some(listener), shutdown_signal()).await
    }

    /// Run until the search finishes or `shutdown` resolves. The last
    /// confirmed counterexample is saved either way.
    pub async fn run_until<F>(mut self, listener: Option<TcpListener>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener_task = match listener {
            Some(listener) => {
                self.preempt_port = listener
                    .local_addr()
                    .context("Preemption listener has no local address")?
                    .port();
                Some(tokio::spawn(serve_preemptions(listener, Arc::clone(&self.signal))))
            }
            None => None,
        };
        info!(
            node = %self.node_id,
            coordinator = self.coordinator.as_deref().unwrap_or("none"),
            preempt_port = self.preempt_port,
            tasks = self.config.search.tasks,
            "Worker starting"
        );

        let outcome = tokio::select! {
            result = self.search() => result,
            _ = shutdown => {
                info!("Interrupted");
                Ok(())
            }
        };

        if let Some(task) = listener_task {
            task.abort();
        }
        let saved = self.save_confirmed();
        outcome.and(saved)
    }

    async fn search(&mut self) -> Result<()> {
        let seed = match self.config.worker.seed_graph.clone() {
            Some(path) => {
                let graph = read_graph_file(&path)?;
                let (graph, verified) = verify(graph).await?;
                if verified {
                    info!(path = %path.display(), size = graph.size(), "Loaded seed counterexample");
                    self.confirmed = Some(graph.clone());
                } else {
                    warn!(path = %path.display(), size = graph.size(), "Seed graph has monochromatic cliques, searching from it anyway");
                }
                Some((graph, verified))
            }
            None => None,
        };

        let adopted = match self.resync().await {
            Ok(adopted) => adopted,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Initial sync failed, searching locally");
                None
            }
        };

        let mut driver = match (adopted, seed) {
            (Some(graph), _) | (None, Some((graph, true))) => {
                SearchDriver::from_counterexample(graph, &self.config.search)
            }
            (None, Some((graph, false))) => SearchDriver::new(graph, &self.config.search),
            (None, None) => SearchDriver::fresh(&self.config.search),
        };
        info!(size = driver.size(), "Search starting");

        let started = Instant::now();
        loop {
            if let Some(pushed) = self.signal.take() {
                if let Some(graph) = self.on_preemption(pushed).await {
                    let size = driver.adopt(graph);
                    info!(size, "Restarted from adopted graph");
                }
            }

            let (returned, event) = tokio::task::spawn_blocking(move || {
                let mut driver = driver;
                let event = driver.step();
                (driver, event)
            })
            .await
            .context("Search round panicked")?;
            driver = returned;

            match event {
                StepEvent::CounterExample(graph) => {
                    info!(size = graph.size(), rounds = driver.rounds(), "Counterexample found");
                    self.confirmed = Some(graph.clone());
                    self.record(&graph).await?;
                    let next = match self.resync().await {
                        Ok(Some(adopted)) => driver.adopt(adopted),
                        Ok(None) => driver.advance(),
                        Err(e) => {
                            warn!(error = %format!("{e:#}"), "Sync failed, continuing locally");
                            driver.advance()
                        }
                    };
                    info!(size = next, "Growing to next target");
                }
                StepEvent::Moved { size, from, to } => {
                    debug!(size, from, to, taboo = driver.taboo_len(), "Applied move");
                    let rounds = driver.rounds();
                    if rounds % PROGRESS_INTERVAL == 0 {
                        let elapsed = started.elapsed();
                        info!(
                            size,
                            cliques = to,
                            rounds,
                            elapsed = %format_duration(elapsed),
                            rate = %format_rate(calculate_rate(rounds, elapsed)),
                            "Progress"
                        );
                    }
                }
                StepEvent::Reverted { size } => {
                    info!(size, "No admissible move, rebuilt from checkpoint");
                }
                StepEvent::Finished { size } => {
                    info!(size, "Reached maximum size, stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Report the confirmed graph and accept a larger one in return.
    /// Errors only on communication failure.
    async fn resync(&mut self) -> Result<Option<Graph>> {
        let Some(addr) = self.coordinator.clone() else {
            return Ok(None);
        };
        let report = self.confirmed.clone().unwrap_or_default();
        let reply = protocol::sync(&addr, self.preempt_port, &report).await?;
        Ok(self.accept(reply).await)
    }

    async fn on_preemption(&mut self, pushed: Graph) -> Option<Graph> {
        info!(size = pushed.size(), "Preempted, resyncing");
        match self.resync().await {
            Ok(adopted) => adopted,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Resync failed, falling back to pushed graph");
                self.accept(pushed).await
            }
        }
    }

    /// Adopt `graph` if it is a larger counterexample than the confirmed one.
    async fn accept(&mut self, graph: Graph) -> Option<Graph> {
        if graph.is_empty() {
            return None;
        }
        if let Err(e) = graph.validate() {
            warn!(error = %e, "Ignoring malformed graph");
            return None;
        }
        let current = self.confirmed.as_ref().map_or(0, Graph::size);
        if graph.size() <= current {
            debug!(size = graph.size(), current, "Ignoring graph no larger than ours");
            return None;
        }
        match verify(graph).await {
            Ok((graph, true)) => {
                info!(size = graph.size(), "Adopting counterexample");
                self.confirmed = Some(graph.clone());
                Some(graph)
            }
            Ok((graph, false)) => {
                warn!(size = graph.size(), "Received graph is not a counterexample, ignoring");
                None
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Verification failed");
                None
            }
        }
    }

    async fn record(&mut self, graph: &Graph) -> Result<()> {
        let path = counterexample_path(&self.config.search.counterexample_dir, graph.size());
        match save_state(&path, graph) {
            Ok(()) => info!(path = %path.display(), "Saved counterexample"),
            Err(e) => warn!(path = %path.display(), error = %format!("{e:#}"), "Failed to save counterexample"),
        }

        let Some(mut bank) = self.bank.take() else {
            return Ok(());
        };
        let graph = graph.clone();
        let levels = self.config.bank.harvest_levels;
        let (bank, result) = tokio::task::spawn_blocking(move || {
            let result = deposit(&mut bank, &graph, levels);
            (bank, result)
        })
        .await
        .context("Bank task panicked")?;
        self.bank = Some(bank);
        result
    }

    fn save_confirmed(&self) -> Result<()> {
        if let Some(graph) = &self.confirmed {
            let path = counterexample_path(&self.config.search.counterexample_dir, graph.size());
            save_state(&path, graph)?;
            info!(path = %path.display(), size = graph.size(), "Saved last confirmed counterexample");
        }
        Ok(())
    }
}

/// Offer `graph` to the bank and harvest it if it was new.
fn deposit(bank: &mut SolutionBank<ExternalOracle>, graph: &Graph, levels: usize) -> Result<()> {
    if bank.add_coin(graph)? && levels > 0 {
        bank.harvest(graph, levels)?;
    }
    Ok(())
}

/// Clique-count `graph` off the async runtime.
async fn verify(graph: Graph) -> Result<(Graph, bool)> {
    tokio::task::spawn_blocking(move || {
        let verified = graph.is_counterexample();
        (graph, verified)
    })
    .await
    .context("Verification task panicked")
}
