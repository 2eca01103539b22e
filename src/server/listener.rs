//! Traffic server
//!
//! Binds the websocket listener and runs the two ingestion pipelines
//! alongside it.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::broadcast::Broadcaster;
use crate::error::Result;
use crate::ingest::{ChannelSource, DetectionPipeline, FramePipeline};
use crate::model::DetectionPayload;
use crate::registry::SubscriberRegistry;
use crate::server::config::ServerConfig;
use crate::server::ws::{router, AppState};
use crate::stats::PipelineStats;
use crate::store::{PersistenceGate, RecordStore};

/// Traffic camera server
pub struct TrafficServer<P: DetectionPayload> {
    config: ServerConfig,
    store: Arc<dyn RecordStore<P>>,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<PipelineStats>,
}

impl<P: DetectionPayload> TrafficServer<P> {
    /// Create a new server backed by the given record store
    pub fn new(config: ServerConfig, store: Arc<dyn RecordStore<P>>) -> Self {
        if config.record_shape != P::SHAPE {
            tracing::warn!(
                configured = %config.record_shape,
                actual = %P::SHAPE,
                "Record shape does not match payload type"
            );
        }

        let registry = Arc::new(SubscriberRegistry::with_config(config.registry.clone()));

        Self {
            config,
            store,
            registry,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get a reference to the record store
    pub fn store(&self) -> &Arc<dyn RecordStore<P>> {
        &self.store
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, shape = %P::SHAPE, "Traffic server listening");

        let broadcaster = Arc::new(Broadcaster::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
            self.config.send_timeout,
        ));

        let (detections_tx, detections) = ChannelSource::new(self.config.ingest_queue_capacity);
        let (frames_tx, frames) = ChannelSource::new(self.config.ingest_queue_capacity);

        let detection_pipeline = DetectionPipeline::new(
            PersistenceGate::new(Arc::clone(&self.store)),
            Arc::clone(&broadcaster),
            Arc::clone(&self.stats),
        )
        .workers(self.config.ingest_workers)
        .queue_capacity(self.config.ingest_queue_capacity);
        let frame_pipeline = FramePipeline::new(broadcaster, Arc::clone(&self.stats));

        let detection_task = tokio::spawn(detection_pipeline.run(detections));
        let frame_task = tokio::spawn(frame_pipeline.run(frames));

        let app = router(AppState {
            registry: Arc::clone(&self.registry),
            detections: detections_tx,
            frames: frames_tx,
            stats: Arc::clone(&self.stats),
            viewer_queue_capacity: self.config.viewer_queue_capacity,
            close_timeout: self.config.send_timeout,
        });

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;
        tracing::info!("Shutdown signal received");

        // Producer sockets still hold senders; pipelines end once they close
        for task in [detection_task, frame_task] {
            let abort = task.abort_handle();
            if tokio::time::timeout(self.config.shutdown_grace, task)
                .await
                .is_err()
            {
                tracing::warn!("Pipeline did not drain in time, aborting");
                abort.abort();
            }
        }

        let stats = self.stats.snapshot();
        tracing::info!(
            events = stats.events_received,
            appended = stats.records_appended,
            dropped = stats.dropped_events(),
            evicted = stats.subscribers_evicted,
            "Traffic server stopped"
        );

        result.map_err(Into::into)
    }
}
