//! Broadcast fan-out
//!
//! Serializes each event once and writes the shared bytes to every targeted
//! subscriber concurrently. A failed or timed-out write evicts that one
//! subscriber and never affects delivery to the rest.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;

use crate::model::{encode_record, DetectionPayload, DetectionRecord};
use crate::registry::{Outbound, Subscriber, SubscriberRegistry};
use crate::stats::PipelineStats;

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers targeted
    pub recipients: usize,
    /// Subscribers that received the message
    pub delivered: usize,
    /// Subscribers evicted after a failed send
    pub evicted: usize,
}

/// Fan-out from the pipelines to registered subscribers
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    stats: Arc<PipelineStats>,
    send_timeout: Duration,
}

impl Broadcaster {
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        stats: Arc<PipelineStats>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            stats,
            send_timeout,
        }
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Deliver a persisted record to global subscribers and to subscribers of `label`
    pub async fn publish<P: DetectionPayload>(
        &self,
        label: &str,
        record: &DetectionRecord<P>,
    ) -> Delivery {
        let data = match encode_record(label, record) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(camera = %label, error = %e, "Failed to serialize detection record");
                return Delivery::default();
            }
        };

        let mut recipients = self.registry.global_subscribers().await;
        recipients.extend(self.registry.label_subscribers(label).await);

        let delivery = self.deliver(label, recipients, Outbound::Text(data)).await;
        self.stats.record_messages_delivered(delivery.delivered);

        tracing::debug!(
            camera = %label,
            recipients = delivery.recipients,
            delivered = delivery.delivered,
            "Detection record broadcast"
        );

        delivery
    }

    /// Deliver a raw frame to the frame subscribers of `label`
    ///
    /// Empty frames are rejected without sending anything.
    pub async fn publish_frame(&self, label: &str, frame: Bytes) -> Delivery {
        if frame.is_empty() {
            tracing::warn!(camera = %label, "Rejected empty frame");
            self.stats.record_rejected();
            return Delivery::default();
        }

        let recipients = self.registry.frame_subscribers(label).await;
        let size = frame.len();

        let delivery = self.deliver(label, recipients, Outbound::Binary(frame)).await;
        self.stats.record_frames_delivered(delivery.delivered);

        tracing::debug!(
            camera = %label,
            bytes = size,
            delivered = delivery.delivered,
            "Frame broadcast"
        );

        delivery
    }

    async fn deliver(&self, label: &str, recipients: Vec<Subscriber>, message: Outbound) -> Delivery {
        let timeout = self.send_timeout;

        let sends = recipients.iter().map(|subscriber| {
            let message = message.clone();
            async move { (subscriber.id(), subscriber.send(message, timeout).await) }
        });
        let results = join_all(sends).await;

        let mut delivery = Delivery {
            recipients: results.len(),
            ..Default::default()
        };

        for (id, result) in results {
            match result {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        subscriber = %id,
                        camera = %label,
                        error = %e,
                        "Delivery failed, evicting subscriber"
                    );
                    if self.registry.unregister(id).await {
                        delivery.evicted += 1;
                    }
                }
            }
        }

        if delivery.evicted > 0 {
            self.stats.record_evicted(delivery.evicted);
        }

        delivery
    }
}
