//! Coordinator/worker protocol
//!
//! Every exchange is one request and one response on a fresh TCP
//! connection. Messages are serialized as MessagePack maps (rmp-serde), so
//! the serde field names of [`Graph`] appear on the wire.
//!
//! # Protocol Version
//!
//! Current version: 1
//!
//! # Message Flow
//!
//! ```text
//! Worker                          Coordinator
//!     |                              |
//!     |-- SYNC(port, graph) -------->|   graph may be empty
//!     |<----- SYNC_REPLY(graph) -----|   empty unless coordinator is ahead
//!     |                              |
//!     |<------ PREEMPT(graph) -------|   on the worker's preemption port
//!     |-- PREEMPT_ACK -------------->|
//!     |                              |
//! Operator                           |
//!     |-- STATUS ------------------->|
//!     |<----- STATUS_REPLY ----------|
//! ```
//!
//! Malformed requests are answered with `BAD_REQUEST`.
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```

use crate::graph::Graph;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Protocol version
///
/// Increment this when making breaking changes to the protocol.
/// Coordinator and workers must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest accepted frame (100MB).
pub const MAX_MESSAGE_LEN: usize = 100 * 1024 * 1024;

/// Protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Worker -> Coordinator: report the best confirmed counterexample
    Sync(SyncMessage),

    /// Coordinator -> Worker: the latest graph, or empty
    SyncReply(Graph),

    /// Coordinator -> Worker: a larger counterexample exists
    Preempt(Graph),

    /// Worker -> Coordinator: preemption received
    PreemptAck,

    /// Operator -> Coordinator: request a status report
    Status,

    /// Coordinator -> Operator: status report
    StatusReply(StatusReport),

    /// Either direction: the request could not be served
    BadRequest(ErrorMessage),
}

impl Message {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Sync(_) => "SYNC",
            Message::SyncReply(_) => "SYNC_REPLY",
            Message::Preempt(_) => "PREEMPT",
            Message::PreemptAck => "PREEMPT_ACK",
            Message::Status => "STATUS",
            Message::StatusReply(_) => "STATUS_REPLY",
            Message::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

/// Sync request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncMessage {
    pub protocol_version: u32,
    /// Port of the worker's preemption listener; with the peer IP this
    /// forms the worker's identity.
    pub preempt_port: u16,
    /// The worker's best confirmed counterexample (empty if none)
    pub graph: Graph,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error: String,
}

/// Snapshot of coordinator state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub latest_size: usize,
    pub latest_ones: usize,
    pub updated_at: Option<DateTime<Utc>>,
    pub workers: Vec<WorkerEntry>,
    pub generated_at: DateTime<Utc>,
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEntry {
    pub identity: String,
    pub size: usize,
}

/// Serialize a message to bytes
///
/// # Message Format
///
/// ```text
/// [4 bytes: message length (little-endian u32)][N bytes: MessagePack message]
/// ```
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec_named(msg)
        .context("Failed to serialize message")?;

    if msg_bytes.len() > MAX_MESSAGE_LEN {
        anyhow::bail!("Message too large: {} bytes (max 100MB)", msg_bytes.len());
    }

    // Prepend length field
    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize a message from bytes
///
/// Expects a 4-byte length prefix followed by MessagePack-serialized message.
///
/// # Returns
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the length prefix.
pub fn deserialize_message(buf: &[u8]) -> Result<(Message, usize)> {
    if buf.len() < 4 {
        anyhow::bail!("Buffer too small for message length (need 4 bytes, got {})", buf.len());
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

    if buf.len() < 4 + msg_len {
        anyhow::bail!("Incomplete message (need {} bytes, got {})", 4 + msg_len, buf.len());
    }

    let msg = rmp_serde::from_slice(&buf[4..4 + msg_len])
        .context("Failed to deserialize message")?;

    Ok((msg, 4 + msg_len))
}

/// Read a complete message from a stream
///
/// Reads the length prefix, then reads the complete message.
pub async fn read_message<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Message> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await
        .context("Failed to read message length")?;

    let msg_len = u32::from_le_bytes(len_buf) as usize;

    if msg_len > MAX_MESSAGE_LEN {
        anyhow::bail!("Message too large: {} bytes (max 100MB)", msg_len);
    }

    let mut msg_buf = vec![0u8; msg_len];
    stream.read_exact(&mut msg_buf).await
        .context("Failed to read message body")?;

    let msg = rmp_serde::from_slice(&msg_buf)
        .context("Failed to deserialize message")?;

    Ok(msg)
}

/// Write a message to a stream
///
/// Serializes the message with length prefix and writes to stream.
pub async fn write_message<S: AsyncWrite + Unpin>(stream: &mut S, msg: &Message) -> Result<()> {
    let framed = serialize_message(msg)?;

    stream.write_all(&framed).await
        .context("Failed to write message")?;

    // Flush to ensure message is sent immediately
    stream.flush().await
        .context("Failed to flush stream")?;

    Ok(())
}

/// Connect to `addr`, send one request, and wait for the response.
pub async fn request(addr: &str, msg: &Message) -> Result<Message> {
    let mut stream = TcpStream::connect(addr).await
        .with_context(|| format!("Failed to connect to {}", addr))?;
    write_message(&mut stream, msg).await?;
    read_message(&mut stream).await
        .with_context(|| format!("No response from {}", addr))
}

/// Send a sync request and return the coordinator's graph (empty if none).
pub async fn sync(addr: &str, preempt_port: u16, graph: &Graph) -> Result<Graph> {
    let msg = Message::Sync(SyncMessage {
        protocol_version: PROTOCOL_VERSION,
        preempt_port,
        graph: graph.clone(),
    });
    match request(addr, &msg).await? {
        Message::SyncReply(graph) => Ok(graph),
        Message::BadRequest(e) => anyhow::bail!("Coordinator rejected sync: {}", e.error),
        other => anyhow::bail!("Unexpected response to SYNC: {}", other.kind()),
    }
}

/// Ask the coordinator for a status report.
pub async fn status(addr: &str) -> Result<StatusReport> {
    match request(addr, &Message::Status).await? {
        Message::StatusReply(report) => Ok(report),
        Message::BadRequest(e) => anyhow::bail!("Coordinator rejected status request: {}", e.error),
        other => anyhow::bail!("Unexpected response to STATUS: {}", other.kind()),
    }
}
