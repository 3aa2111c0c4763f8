//! Preemption listener
//!
//! Workers accept `PREEMPT` pushes from the coordinator on their own port.
//! A push is acknowledged as soon as it has been parked in the worker's
//! [`PreemptSignal`]; the search loop picks it up between rounds.

use crate::distributed::protocol::{read_message, write_message, ErrorMessage, Message};
use crate::graph::Graph;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Single-slot mailbox for pushed graphs. A newer push replaces an
/// unconsumed older one.
#[derive(Debug, Default)]
pub struct PreemptSignal {
    slot: Mutex<Option<Graph>>,
}

impl PreemptSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `graph`. Returns true if it replaced a pending graph.
    pub fn raise(&self, graph: Graph) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(graph)
            .is_some()
    }

    /// Consume the pending graph, if any.
    pub fn take(&self) -> Option<Graph> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn is_raised(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

/// Accept preemption pushes forever.
pub async fn serve_preemptions(listener: TcpListener, signal: Arc<PreemptSignal>) -> Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept preemption connection")?;
        let signal = Arc::clone(&signal);
        tokio::spawn(async move {
            if let Err(e) = handle_push(stream, &signal).await {
                warn!(peer = %peer, error = %format!("{e:#}"), "Preemption connection failed");
            }
        });
    }
}

async fn handle_push(mut stream: TcpStream, signal: &PreemptSignal) -> Result<()> {
    let reply = match read_message(&mut stream).await? {
        Message::Preempt(graph) => match graph.validate() {
            Ok(()) => {
                info!(size = graph.size(), "Preemption received");
                if signal.raise(graph) {
                    debug!("Replaced an unconsumed preemption");
                }
                Message::PreemptAck
            }
            Err(e) => Message::BadRequest(ErrorMessage {
                error: e.to_string(),
            }),
        },
        other => Message::BadRequest(ErrorMessage {
            error: format!("unexpected request: {}", other.kind()),
        }),
    };
    write_message(&mut stream, &reply).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::protocol::request;
    use crate::graph::tests::paley17;

    #[test]
    fn test_latest_push_wins() {
        let signal = PreemptSignal::new();
        assert!(!signal.is_raised());
        assert!(!signal.raise(Graph::zeroed(13)));
        assert!(signal.raise(paley17()));
        assert_eq!(signal.take(), Some(paley17()));
        assert_eq!(signal.take(), None);
    }

    #[tokio::test]
    async fn test_listener_acks_and_raises() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let signal = Arc::new(PreemptSignal::new());
        tokio::spawn(serve_preemptions(listener, Arc::clone(&signal)));

        let reply = request(&addr, &Message::Preempt(paley17())).await.unwrap();
        assert!(matches!(reply, Message::PreemptAck));
        assert_eq!(signal.take(), Some(paley17()));
    }

    #[tokio::test]
    async fn test_listener_rejects_bad_pushes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let signal = Arc::new(PreemptSignal::new());
        tokio::spawn(serve_preemptions(listener, Arc::clone(&signal)));

        let bad: Graph = serde_json::from_str(r#"{"G":[0],"Size":3,"Parity":1}"#).unwrap();
        let reply = request(&addr, &Message::Preempt(bad)).await.unwrap();
        assert!(matches!(reply, Message::BadRequest(_)));

        let reply = request(&addr, &Message::Status).await.unwrap();
        assert!(matches!(reply, Message::BadRequest(_)));
        assert!(!signal.is_raised());
    }
}
