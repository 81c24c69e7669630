//! Connection registry for live viewers
//!
//! This module tracks which viewer connections are currently open. The
//! registry only owns membership: the bytes of each channel belong to the
//! transport, which is reached through the [`ViewerSink`] trait.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::error::{ErrorCategory, PulsecastErrorTrait};
use crate::models::Frame;

// ============================================================================
// Connection Identity
// ============================================================================

/// Unique identifier of one viewer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Per-connection delivery failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The viewer side of the channel is gone
    #[error("connection closed")]
    Closed,

    /// The viewer is not draining its queue fast enough
    #[error("send queue full")]
    QueueFull,

    /// The transport rejected the frame
    #[error("transport error: {0}")]
    Transport(String),
}

impl PulsecastErrorTrait for DeliveryError {
    /// Only a full queue is worth keeping the connection for
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::QueueFull)
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Delivery
    }
}

/// Outgoing half of a viewer's duplex channel
pub trait ViewerSink: Send + Sync {
    /// Whether the transport still considers the channel open
    fn is_open(&self) -> bool;

    /// Hand one frame to the transport without waiting
    fn deliver(&self, frame: Frame) -> Result<(), DeliveryError>;
}

/// Sink feeding a bounded queue drained by the connection's writer task
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
}

impl ChannelSink {
    /// Create a sink and the receiver its writer task drains
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl ViewerSink for ChannelSink {
    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to one open viewer channel
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    sink: Arc<dyn ViewerSink>,
}

impl Connection {
    pub fn new(sink: Arc<dyn ViewerSink>) -> Self {
        Self {
            id: ConnectionId::new(),
            sink,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_open()
    }

    pub fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.sink.deliver(frame)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// Connection Registry
// ============================================================================

/// Set of currently open viewer connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection; re-adding the same connection is a no-op
    pub async fn add(&self, connection: Connection) {
        self.connections
            .write()
            .await
            .entry(connection.id())
            .or_insert(connection);
    }

    /// Remove a connection, returning whether it was still registered
    ///
    /// Close and error may both fire for one connection, so removing an
    /// absent id is not an error.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        self.connections.write().await.remove(&id).is_some()
    }

    /// Number of registered connections
    pub async fn size(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Copy of the current membership, in no particular order
    ///
    /// The lock is released before this returns, so callers may await while
    /// walking the result.
    pub async fn snapshot(&self) -> Vec<Connection> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Visit every registered connection
    pub async fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Connection),
    {
        for connection in self.snapshot().await.iter() {
            visitor(connection);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
