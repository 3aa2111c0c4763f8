//! Coordinator
//!
//! The coordinator:
//! - Accepts one sync request per connection from workers
//! - Keeps the largest counterexample reported so far ([`LatestStore`])
//! - Tracks which worker holds which size ([`Registry`])
//! - Pushes a newly-largest graph to every worker that is behind
//! - Answers status queries
//!
//! Broadcasts run on a single background task fed by a bounded queue, so a
//! sync reply never waits on slow workers. Failing to persist the latest
//! graph is fatal and stops the server.

use crate::config::CoordinatorConfig;
use crate::distributed::latest::LatestStore;
use crate::distributed::protocol::*;
use crate::distributed::shutdown_signal;
use crate::distributed::registry::{Registration, Registry};
use crate::graph::Graph;
use anyhow::{Context, Result};
use chrono::Utc;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Why a sync request failed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request is malformed; the worker gets a `BAD_REQUEST`.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The latest graph could not be saved; the coordinator must stop.
    #[error("failed to persist latest graph")]
    Persistence(#[source] anyhow::Error),
}

/// Result of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Graph to send back: the latest if the worker is behind, else empty.
    pub response: Graph,
    /// Size to broadcast, set when the reported graph is a new maximum.
    pub broadcast: Option<usize>,
}

/// What a preemption broadcast did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreemptReport {
    pub target_size: usize,
    /// Set when a larger graph arrived first and this broadcast was skipped.
    pub superseded: bool,
    pub delivered: Vec<String>,
    pub removed: Vec<String>,
}

/// Shared coordinator state
pub struct CoordinatorState {
    registry: Registry,
    latest: LatestStore,
    registry_path: Option<PathBuf>,
    push_timeout: Duration,
    broadcast_guard: tokio::sync::Mutex<()>,
}

impl CoordinatorState {
    /// Load persisted state as described by `config`.
    pub fn open(config: &CoordinatorConfig) -> Result<Self> {
        let latest = LatestStore::open(&config.latest_path)?;
        let registry = match &config.registry_path {
            Some(path) => Registry::load(path)?,
            None => Registry::new(),
        };
        info!(
            latest_size = latest.size(),
            workers = registry.len(),
            state = %latest.path().display(),
            "Coordinator state loaded"
        );
        Ok(Self {
            registry,
            latest,
            registry_path: config.registry_path.clone(),
            push_timeout: Duration::from_millis(config.push_timeout_ms),
            broadcast_guard: tokio::sync::Mutex::new(()),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn latest(&self) -> &LatestStore {
        &self.latest
    }

    /// Handle a graph reported by the worker known as `identity`.
    pub fn sync(&self, identity: &str, graph: Graph) -> Result<SyncOutcome, SyncError> {
        graph
            .validate()
            .map_err(|e| SyncError::BadRequest(e.to_string()))?;

        let size = graph.size();
        match self.registry.record(identity, size) {
            Registration::New => info!(worker = %identity, size, "Registered worker"),
            Registration::Updated { previous } if previous != size => {
                debug!(worker = %identity, previous, size, "Worker size changed")
            }
            Registration::Updated { .. } => {}
        }

        let latest_size = self.latest.size();
        if size < latest_size {
            debug!(worker = %identity, size, latest_size, "Worker is behind, replying with latest");
            return Ok(SyncOutcome {
                response: self.latest.get(),
                broadcast: None,
            });
        }

        if self.latest.update(graph) {
            self.latest.save().map_err(SyncError::Persistence)?;
        }

        let broadcast = if size > latest_size {
            info!(worker = %identity, size, previous = latest_size, "New largest counterexample");
            Some(size)
        } else {
            None
        };
        Ok(SyncOutcome {
            response: Graph::empty(),
            broadcast,
        })
    }

    /// Push the latest graph to every registered worker that is behind it.
    ///
    /// Workers that cannot be reached are dropped from the registry; the
    /// worker that triggered the broadcast is skipped. If a larger graph has
    /// arrived since `target_size` was scheduled, that graph is pushed
    /// instead to every worker not already at its size, since its own
    /// broadcast job may have been dropped from a full queue.
    pub async fn preempt(&self, target_size: usize, origin: Option<&str>) -> PreemptReport {
        let _guard = self.broadcast_guard.lock().await;
        let graph = self.latest.get();
        let superseded = target_size < graph.size();
        let mut report = PreemptReport {
            target_size,
            superseded,
            ..PreemptReport::default()
        };

        if superseded {
            debug!(target_size, latest = graph.size(), "Broadcast superseded, pushing the larger graph");
        }

        for entry in self.registry.snapshot() {
            let skip = if superseded {
                entry.size >= graph.size()
            } else {
                origin == Some(entry.identity.as_str()) || entry.size > graph.size()
            };
            if skip {
                continue;
            }
            match push_preemption(&entry.identity, &graph, self.push_timeout).await {
                Ok(()) => {
                    self.registry.update_existing(&entry.identity, graph.size());
                    report.delivered.push(entry.identity);
                }
                Err(e) => {
                    warn!(worker = %entry.identity, error = %format!("{e:#}"), "Preemption failed, dropping worker");
                    self.registry.remove(&entry.identity);
                    report.removed.push(entry.identity);
                }
            }
        }

        info!(
            size = graph.size(),
            delivered = report.delivered.len(),
            removed = report.removed.len(),
            "Preemption broadcast complete"
        );
        report
    }

    pub fn status(&self) -> StatusReport {
        let graph = self.latest.get();
        StatusReport {
            latest_size: graph.size(),
            latest_ones: graph.ones(),
            updated_at: self.latest.updated_at(),
            workers: self.registry.snapshot(),
            generated_at: Utc::now(),
        }
    }

    /// Persist the latest graph and, if configured, the registry.
    pub fn save(&self) -> Result<()> {
        self.latest.save()?;
        if let Some(path) = &self.registry_path {
            self.registry.save(path)?;
        }
        Ok(())
    }
}

/// Send one `PREEMPT` to `addr` and wait for the acknowledgement.
async fn push_preemption(addr: &str, graph: &Graph, timeout: Duration) -> Result<()> {
    let reply = tokio::time::timeout(timeout, request(addr, &Message::Preempt(graph.clone())))
        .await
        .with_context(|| format!("Timed out after {:?}", timeout))??;
    match reply {
        Message::PreemptAck => Ok(()),
        Message::BadRequest(e) => anyhow::bail!("Worker rejected preemption: {}", e.error),
        other => anyhow::bail!("Unexpected response to PREEMPT: {}", other.kind()),
    }
}

#[derive(Debug)]
struct BroadcastJob {
    size: usize,
    origin: String,
}

/// Handle to the background broadcast task.
#[derive(Clone)]
struct Broadcaster {
    tx: mpsc::Sender<BroadcastJob>,
}

impl Broadcaster {
    fn spawn(state: Arc<CoordinatorState>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<BroadcastJob>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                state.preempt(job.size, Some(&job.origin)).await;
            }
        });
        Self { tx }
    }

    fn schedule(&self, job: BroadcastJob) {
        if let Err(e) = self.tx.try_send(job) {
            warn!(error = %e, "Broadcast queue full, dropping broadcast");
        }
    }
}

/// Coordinator server
pub struct Coordinator {
    config: CoordinatorConfig,
    state: Arc<CoordinatorState>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        let state = Arc::new(CoordinatorState::open(&config)?);
        Ok(Self { config, state })
    }

    pub fn state(&self) -> Arc<CoordinatorState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind coordinator to {}", self.config.listen_addr))?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves or a fatal error occurs.
    /// State is saved on clean shutdown.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = listener.local_addr().context("Listener has no local address")?;
        info!(addr = %local, latest_size = self.state.latest().size(), "Coordinator listening");

        let broadcaster = Broadcaster::spawn(self.state(), self.config.broadcast_queue);
        let (fatal_tx, mut fatal_rx) = mpsc::channel::<anyhow::Error>(1);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    let state = self.state();
                    let broadcaster = broadcaster.clone();
                    let fatal_tx = fatal_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, &state, &broadcaster).await {
                            let fatal = matches!(e.downcast_ref::<SyncError>(), Some(SyncError::Persistence(_)));
                            if fatal {
                                let _ = fatal_tx.send(e).await;
                            } else {
                                debug!(peer = %peer, error = %format!("{e:#}"), "Connection ended with error");
                            }
                        }
                    });
                }
                Some(e) = fatal_rx.recv() => {
                    error!(error = %format!("{e:#}"), "Fatal coordinator error, shutting down");
                    return Err(e);
                }
                _ = &mut shutdown => {
                    info!("Shutting down coordinator");
                    self.state.save().context("Failed to save coordinator state on shutdown")?;
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    state: &CoordinatorState,
    broadcaster: &Broadcaster,
) -> Result<()> {
    let request = match read_message(&mut stream).await {
        Ok(msg) => msg,
        Err(e) => {
            let reply = Message::BadRequest(ErrorMessage {
                error: format!("{e:#}"),
            });
            // Best effort; the peer may already be gone.
            let _ = write_message(&mut stream, &reply).await;
            return Err(e);
        }
    };

    let reply = match request {
        Message::Sync(sync) if sync.protocol_version != PROTOCOL_VERSION => {
            warn!(peer = %peer, version = sync.protocol_version, "Protocol version mismatch");
            Message::BadRequest(ErrorMessage {
                error: format!(
                    "protocol version mismatch: expected {}, got {}",
                    PROTOCOL_VERSION, sync.protocol_version
                ),
            })
        }
        Message::Sync(sync) => {
            let identity = format!("{}:{}", peer.ip(), sync.preempt_port);
            match state.sync(&identity, sync.graph) {
                Ok(outcome) => {
                    if let Some(size) = outcome.broadcast {
                        broadcaster.schedule(BroadcastJob {
                            size,
                            origin: identity,
                        });
                    }
                    Message::SyncReply(outcome.response)
                }
                Err(SyncError::BadRequest(reason)) => {
                    warn!(worker = %identity, reason = %reason, "Rejected sync");
                    Message::BadRequest(ErrorMessage { error: reason })
                }
                Err(e) => return Err(e.into()),
            }
        }
        Message::Status => Message::StatusReply(state.status()),
        other => {
            warn!(peer = %peer, kind = other.kind(), "Unexpected request");
            Message::BadRequest(ErrorMessage {
                error: format!("unexpected request: {}", other.kind()),
            })
        }
    };

    write_message(&mut stream, &reply).await
}
