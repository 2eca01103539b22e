//! Detection ingestion pipeline
//!
//! Pulls detection events from a source, persists each through the gate and
//! broadcasts only what was actually persisted. Events are sharded across
//! workers by camera label, so every label is handled by exactly one worker
//! and its events reach the store (and subscribers) in arrival order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::broadcast::{Broadcaster, Delivery};
use crate::error::AppendError;
use crate::model::{DetectionEvent, DetectionPayload};
use crate::stats::PipelineStats;
use crate::store::PersistenceGate;

use super::source::EventSource;

/// What happened to one ingested event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Persisted and broadcast
    Published(Delivery),
    /// No camera with this label; nothing persisted or broadcast
    UnknownCamera,
    /// Event carried no usable record
    Rejected,
    /// The store failed; the event was dropped
    StoreFailed,
}

struct DetectionHandler<P> {
    gate: PersistenceGate<P>,
    broadcaster: Arc<Broadcaster>,
    stats: Arc<PipelineStats>,
}

impl<P: DetectionPayload> DetectionHandler<P> {
    async fn handle(&self, event: DetectionEvent<P>) -> IngestOutcome {
        self.stats.record_event();
        let (label, record) = event.into_record();

        match self.gate.append_record(&label, record.as_ref()).await {
            Ok(true) => {
                self.stats.record_appended();
                let mut delivery = Delivery::default();
                if let Some(record) = &record {
                    delivery = self.broadcaster.publish(&label, record).await;
                }
                IngestOutcome::Published(delivery)
            }
            Ok(false) => {
                tracing::warn!(camera = %label, "No camera with this label, record dropped");
                self.stats.record_unknown_camera();
                IngestOutcome::UnknownCamera
            }
            Err(AppendError::MissingRecord(_)) => {
                self.stats.record_rejected();
                IngestOutcome::Rejected
            }
            Err(AppendError::Store(e)) => {
                tracing::error!(camera = %label, error = %e, "Failed to persist detection record");
                self.stats.record_store_failure();
                IngestOutcome::StoreFailed
            }
        }
    }
}

/// Detection ingestion loop
pub struct DetectionPipeline<P> {
    handler: Arc<DetectionHandler<P>>,
    workers: usize,
    queue_capacity: usize,
}

impl<P: DetectionPayload> DetectionPipeline<P> {
    /// Create a single-worker pipeline
    pub fn new(
        gate: PersistenceGate<P>,
        broadcaster: Arc<Broadcaster>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            handler: Arc::new(DetectionHandler {
                gate,
                broadcaster,
                stats,
            }),
            workers: 1,
            queue_capacity: 1024,
        }
    }

    /// Set the number of label-sharded workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the per-worker queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Handle one event inline
    pub async fn process(&self, event: DetectionEvent<P>) -> IngestOutcome {
        self.handler.handle(event).await
    }

    /// Consume the source until it is exhausted
    ///
    /// No single event's failure stops the loop.
    pub async fn run<S>(self, mut source: S)
    where
        S: EventSource<DetectionEvent<P>>,
    {
        tracing::info!(workers = self.workers, "Detection pipeline started");

        if self.workers == 1 {
            while let Some(event) = source.next_event().await {
                self.handler.handle(event).await;
            }
            tracing::info!("Detection pipeline stopped");
            return;
        }

        let mut shards = Vec::with_capacity(self.workers);
        let mut tasks = Vec::with_capacity(self.workers);

        for shard in 0..self.workers {
            let (tx, mut rx) = mpsc::channel::<DetectionEvent<P>>(self.queue_capacity);
            let handler = Arc::clone(&self.handler);

            tasks.push(tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    handler.handle(event).await;
                }
                tracing::debug!(shard = shard, "Ingestion worker stopped");
            }));
            shards.push(tx);
        }

        while let Some(event) = source.next_event().await {
            let shard = shard_for(&event.label, self.workers);
            if let Err(mpsc::error::SendError(event)) = shards[shard].send(event).await {
                tracing::error!(
                    shard = shard,
                    camera = %event.label,
                    "Ingestion worker gone, event dropped"
                );
            }
        }

        // Closing the queues lets workers drain what is left and exit
        drop(shards);
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Ingestion worker failed");
            }
        }

        tracing::info!("Detection pipeline stopped");
    }
}

/// Worker index for a camera label
fn shard_for(label: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    label.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}
