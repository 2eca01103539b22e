//! Subscriber connection state machine
//!
//! `Open → Closed`, nothing else. A session enters `Open` only once the
//! registry has accepted it, so no publish can target a connection before
//! registration completes. `Closed` is terminal and removes the subscriber
//! from every index.

use std::time::{Duration, Instant};

use crate::error::RegistryError;
use crate::registry::{Scope, Subscriber, SubscriberId, SubscriberRegistry};

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Registered and receiving publishes
    Open,
    /// Unregistered; terminal
    Closed,
}

/// Lifecycle of one subscriber connection
#[derive(Debug)]
pub struct SubscriberSession {
    id: SubscriberId,
    scope: Scope,
    phase: ConnectionPhase,
    opened_at: Instant,
    closed_at: Option<Instant>,
}

impl SubscriberSession {
    /// Connection-open handler: register the subscriber
    pub async fn on_open(
        registry: &SubscriberRegistry,
        subscriber: Subscriber,
        scope: Scope,
    ) -> Result<Self, RegistryError> {
        let id = registry.register(subscriber, scope.clone()).await?;

        Ok(Self {
            id,
            scope,
            phase: ConnectionPhase::Open,
            opened_at: Instant::now(),
            closed_at: None,
        })
    }

    /// Connection-close handler: unregister the subscriber
    ///
    /// Safe to call more than once, and safe if fan-out already evicted the
    /// subscriber after a failed send.
    pub async fn on_close(&mut self, registry: &SubscriberRegistry) {
        if self.phase == ConnectionPhase::Closed {
            return;
        }

        let was_registered = registry.unregister(self.id).await;
        self.phase = ConnectionPhase::Closed;
        self.closed_at = Some(Instant::now());

        tracing::debug!(
            subscriber = %self.id,
            scope = %self.scope,
            evicted_earlier = !was_registered,
            duration_secs = self.duration().as_secs(),
            "Subscriber session closed"
        );
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == ConnectionPhase::Open
    }

    /// Time the connection has been (or was) open
    pub fn duration(&self) -> Duration {
        match self.closed_at {
            Some(closed_at) => closed_at.duration_since(self.opened_at),
            None => self.opened_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::TransportError;
    use crate::registry::{Outbound, RegistryConfig, Transport};

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn send(&self, _: Outbound) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let registry = SubscriberRegistry::new();
        let subscriber = Subscriber::new(Arc::new(NullTransport));

        let mut session =
            SubscriberSession::on_open(&registry, subscriber, Scope::Camera("CAM-1".into()))
                .await
                .unwrap();
        assert!(session.is_open());
        assert!(registry.contains(session.id()).await);
        assert_eq!(registry.label_subscribers("CAM-1").await.len(), 1);

        session.on_close(&registry).await;
        assert_eq!(session.phase(), ConnectionPhase::Closed);
        assert!(!registry.contains(session.id()).await);

        // Closed is terminal
        session.on_close(&registry).await;
        assert_eq!(session.phase(), ConnectionPhase::Closed);
    }

    #[tokio::test]
    async fn test_close_after_eviction() {
        let registry = SubscriberRegistry::new();
        let mut session = SubscriberSession::on_open(
            &registry,
            Subscriber::new(Arc::new(NullTransport)),
            Scope::Global,
        )
        .await
        .unwrap();

        registry.unregister(session.id()).await;
        session.on_close(&registry).await;

        assert!(!session.is_open());
        assert_eq!(registry.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_open_rejected_when_full() {
        let registry = SubscriberRegistry::with_config(RegistryConfig::default().max_subscribers(1));
        let _first = SubscriberSession::on_open(
            &registry,
            Subscriber::new(Arc::new(NullTransport)),
            Scope::Global,
        )
        .await
        .unwrap();

        let second = SubscriberSession::on_open(
            &registry,
            Subscriber::new(Arc::new(NullTransport)),
            Scope::Global,
        )
        .await;
        assert!(matches!(second, Err(RegistryError::Full(1))));
    }
}
