//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::model::RecordShape;
use crate::registry::RegistryConfig;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Upper bound on handing one message to a subscriber (including waiting
    /// for room in its queue); also the flush window for a closing viewer
    pub send_timeout: Duration,

    /// Label-sharded detection workers
    pub ingest_workers: usize,

    /// Capacity of the producer and per-worker queues
    pub ingest_queue_capacity: usize,

    /// Messages buffered per viewer connection
    pub viewer_queue_capacity: usize,

    /// Detection payload shape for this deployment
    pub record_shape: RecordShape,

    /// How long pipelines may drain after the listener stops
    pub shutdown_grace: Duration,

    /// Subscriber registry settings
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            send_timeout: Duration::from_secs(5),
            ingest_workers: 4,
            ingest_queue_capacity: 1024,
            viewer_queue_capacity: 64,
            record_shape: RecordShape::Categorized,
            shutdown_grace: Duration::from_secs(5),
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set subscriber send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set number of ingestion workers (at least 1)
    pub fn ingest_workers(mut self, workers: usize) -> Self {
        self.ingest_workers = workers.max(1);
        self
    }

    /// Set ingestion queue capacity (at least 1)
    pub fn ingest_queue_capacity(mut self, capacity: usize) -> Self {
        self.ingest_queue_capacity = capacity.max(1);
        self
    }

    /// Set per-viewer queue capacity (at least 1)
    pub fn viewer_queue_capacity(mut self, capacity: usize) -> Self {
        self.viewer_queue_capacity = capacity.max(1);
        self
    }

    /// Set the detection payload shape
    pub fn record_shape(mut self, shape: RecordShape) -> Self {
        self.record_shape = shape;
        self
    }

    /// Set maximum live subscribers (0 = unlimited)
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.registry = self.registry.max_subscribers(max);
        self
    }

    /// Set pipeline drain time on shutdown
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
