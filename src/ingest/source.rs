//! Event sources

use async_trait::async_trait;
use tokio::sync::mpsc;

/// A stream of events feeding an ingestion pipeline
///
/// Delivery is at-least-once with no ordering guarantee across cameras.
/// `None` means the source is exhausted and the pipeline should stop.
#[async_trait]
pub trait EventSource<T: Send>: Send {
    async fn next_event(&mut self) -> Option<T>;
}

/// Event source backed by a bounded mpsc channel
///
/// Producers hold the sender half; the source ends once every sender is dropped.
pub struct ChannelSource<T> {
    rx: mpsc::Receiver<T>,
}

impl<T: Send> ChannelSource<T> {
    /// Create a source and the sender that feeds it
    pub fn new(capacity: usize) -> (mpsc::Sender<T>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl<T: Send> EventSource<T> for ChannelSource<T> {
    async fn next_event(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

#[async_trait]
impl<T: Send> EventSource<T> for mpsc::Receiver<T> {
    async fn next_event(&mut self) -> Option<T> {
        self.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_ends_when_senders_drop() {
        let (tx, mut source) = ChannelSource::new(4);
        tx.send(1u32).await.unwrap();
        tx.send(2u32).await.unwrap();
        drop(tx);

        assert_eq!(source.next_event().await, Some(1));
        assert_eq!(source.next_event().await, Some(2));
        assert_eq!(source.next_event().await, None);
    }
}
