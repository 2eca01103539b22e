//! Subscriber handles and transports
//!
//! A [`Subscriber`] wraps a [`Transport`] (one live outbound connection) with
//! an identity and a write lock. The lock is a fair FIFO queue, so messages
//! handed to one subscriber go out in the order they were sent, even when
//! several publishes race. Removing a subscriber from the registry fires its
//! close signal, which the connection owner watches to tear the socket down.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, Notify};

use crate::error::TransportError;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a subscriber wants to receive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Every detection record, for every camera
    Global,
    /// Detection records for one camera label
    Camera(String),
    /// Raw frames for one camera label
    Frames(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Camera(label) => write!(f, "camera/{}", label),
            Scope::Frames(label) => write!(f, "frames/{}", label),
        }
    }
}

/// A message ready to be written to a connection
///
/// Cheap to clone: the payload is reference-counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// UTF-8 JSON text
    Text(Bytes),
    /// Raw binary payload (camera frames)
    Binary(Bytes),
}

impl Outbound {
    /// Payload bytes
    pub fn as_bytes(&self) -> &Bytes {
        match self {
            Outbound::Text(data) | Outbound::Binary(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Outbound half of a subscriber connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one message to the connection
    async fn send(&self, message: Outbound) -> Result<(), TransportError>;
}

/// A live subscriber connection
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    transport: Arc<dyn Transport>,
    write_lock: Arc<Mutex<()>>,
    closed: Arc<Notify>,
}

impl Subscriber {
    /// Wrap a transport, allocating a fresh subscriber ID
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            id: SubscriberId::next(),
            transport,
            write_lock: Arc::new(Mutex::new(())),
            closed: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Send a message, failing if it does not complete within `timeout`
    ///
    /// Waiting for an earlier in-flight write counts against the timeout.
    pub async fn send(&self, message: Outbound, timeout: Duration) -> Result<(), TransportError> {
        let write = async {
            let _guard = self.write_lock.lock().await;
            self.transport.send(message).await
        };

        match tokio::time::timeout(timeout, write).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Signal the connection owner that this subscriber was removed
    ///
    /// The signal is latched, so a waiter that arrives late still sees it.
    pub fn close(&self) {
        self.closed.notify_one();
    }

    /// Wait until [`close`](Self::close) has been called on any clone
    pub async fn closed(&self) {
        self.closed.notified().await;
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}
