//! Frame ingestion pipeline
//!
//! Frames are not persisted; each one goes straight to the camera's frame
//! topic. This pipeline shares nothing with the detection pipeline except
//! the broadcaster.

use std::sync::Arc;

use crate::broadcast::{Broadcaster, Delivery};
use crate::model::FrameEvent;
use crate::stats::PipelineStats;

use super::source::EventSource;

/// Raw frame ingestion loop
pub struct FramePipeline {
    broadcaster: Arc<Broadcaster>,
    stats: Arc<PipelineStats>,
}

impl FramePipeline {
    pub fn new(broadcaster: Arc<Broadcaster>, stats: Arc<PipelineStats>) -> Self {
        Self { broadcaster, stats }
    }

    /// Broadcast one frame
    pub async fn process(&self, event: FrameEvent) -> Delivery {
        self.stats.record_frame();
        self.broadcaster.publish_frame(&event.label, event.frame).await
    }

    /// Consume the source until it is exhausted
    pub async fn run<S: EventSource<FrameEvent>>(self, mut source: S) {
        tracing::info!("Frame pipeline started");

        while let Some(event) = source.next_event().await {
            self.process(event).await;
        }

        tracing::info!("Frame pipeline stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::error::TransportError;
    use crate::ingest::ChannelSource;
    use crate::registry::{Outbound, Scope, Subscriber, SubscriberRegistry, Transport};

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Outbound>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, message: Outbound) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_routes_frames() {
        let registry = Arc::new(SubscriberRegistry::new());
        let stats = Arc::new(PipelineStats::new());
        let broadcaster = Arc::new(Broadcaster::new(
            registry.clone(),
            stats.clone(),
            Duration::from_secs(1),
        ));

        let recorder = Arc::new(Recorder::default());
        registry
            .register(Subscriber::new(recorder.clone()), Scope::Frames("CAM-1".into()))
            .await
            .unwrap();

        let (tx, source) = ChannelSource::new(8);
        tx.send(FrameEvent::new("CAM-1", Bytes::from_static(b"jpeg-1"))).await.unwrap();
        tx.send(FrameEvent::new("CAM-1", Bytes::new())).await.unwrap();
        tx.send(FrameEvent::new("CAM-2", Bytes::from_static(b"jpeg-2"))).await.unwrap();
        tx.send(FrameEvent::new("CAM-1", Bytes::from_static(b"jpeg-3"))).await.unwrap();
        drop(tx);

        FramePipeline::new(broadcaster, stats.clone()).run(source).await;

        let sent = recorder.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                Outbound::Binary(Bytes::from_static(b"jpeg-1")),
                Outbound::Binary(Bytes::from_static(b"jpeg-3")),
            ]
        );

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_received, 4);
        assert_eq!(snapshot.frames_delivered, 2);
        assert_eq!(snapshot.rejected_input, 1);
    }
}
