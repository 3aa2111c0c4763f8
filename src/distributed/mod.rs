//! Distributed search
//!
//! Workers search independently and exchange counterexamples through a
//! single coordinator.
//!
//! # Architecture
//!
//! - **Coordinator**: Holds the largest known counterexample and a registry of
//!   workers, answers syncs, and pushes preemptions to workers that fall behind
//! - **Worker agent**: Runs the taboo search, syncs after each counterexample,
//!   and listens for preemptions on its own port
//!
//! # Modules
//!
//! - `protocol`: Message definitions and framing
//! - `registry`: Worker identity to last reported size
//! - `latest`: Persisted largest counterexample
//! - `coordinator`: Coordinator state and server
//! - `preempt`: Worker-side preemption listener
//! - `agent`: Worker search loop

pub mod agent;
pub mod coordinator;
pub mod latest;
pub mod preempt;
pub mod protocol;
pub mod registry;

pub use agent::WorkerAgent;
pub use coordinator::{Coordinator, CoordinatorState};
pub use protocol::{Message, StatusReport, WorkerEntry, PROTOCOL_VERSION};

use tracing::error;

/// Host name for log lines, or "unknown".
pub fn node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
