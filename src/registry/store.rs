//! Subscriber registry implementation
//!
//! The single structure mutated by concurrent connection lifecycles. Every
//! mutation takes the write lock; every read hands back a snapshot so callers
//! never iterate while holding the lock across a send.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use crate::error::RegistryError;

use super::config::RegistryConfig;
use super::subscriber::{Scope, Subscriber, SubscriberId};

/// A registered subscriber and the scope it registered under
struct SubscriberEntry {
    subscriber: Subscriber,
    scope: Scope,
}

#[derive(Default)]
struct Membership {
    /// Every live subscriber, regardless of scope
    live: HashMap<SubscriberId, SubscriberEntry>,
    /// Untagged subscribers
    global: HashSet<SubscriberId>,
    /// Record subscribers indexed by camera label
    cameras: HashMap<String, HashSet<SubscriberId>>,
    /// Frame subscribers indexed by camera label
    frames: HashMap<String, HashSet<SubscriberId>>,
}

impl Membership {
    fn index_mut(&mut self, scope: &Scope) -> Option<&mut HashSet<SubscriberId>> {
        match scope {
            Scope::Global => Some(&mut self.global),
            Scope::Camera(label) => self.cameras.get_mut(label),
            Scope::Frames(label) => self.frames.get_mut(label),
        }
    }

    fn insert(&mut self, entry: SubscriberEntry) {
        let id = entry.subscriber.id();

        match &entry.scope {
            Scope::Global => {
                self.global.insert(id);
            }
            Scope::Camera(label) => {
                self.cameras.entry(label.clone()).or_default().insert(id);
            }
            Scope::Frames(label) => {
                self.frames.entry(label.clone()).or_default().insert(id);
            }
        }

        self.live.insert(id, entry);
    }

    fn remove(&mut self, id: SubscriberId) -> Option<SubscriberEntry> {
        let entry = self.live.remove(&id)?;

        let now_empty = match self.index_mut(&entry.scope) {
            Some(index) => {
                index.remove(&id);
                index.is_empty()
            }
            None => false,
        };

        // Drop empty label indexes so the maps don't grow with every camera ever watched
        if now_empty {
            match &entry.scope {
                Scope::Camera(label) => {
                    self.cameras.remove(label);
                }
                Scope::Frames(label) => {
                    self.frames.remove(label);
                }
                Scope::Global => {}
            }
        }

        Some(entry)
    }

    fn collect<'a>(&self, ids: impl IntoIterator<Item = &'a SubscriberId>) -> Vec<Subscriber> {
        ids.into_iter()
            .filter_map(|id| self.live.get(id))
            .map(|entry| entry.subscriber.clone())
            .collect()
    }
}

/// Registry of live subscriber connections
pub struct SubscriberRegistry {
    members: RwLock<Membership>,
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            members: RwLock::new(Membership::default()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a subscriber under a scope
    ///
    /// Once this returns, the next publish targeting the scope includes the
    /// subscriber. Re-registering an existing subscriber moves it to the new
    /// scope. Fails only when the configured subscriber limit is reached.
    pub async fn register(
        &self,
        subscriber: Subscriber,
        scope: Scope,
    ) -> Result<SubscriberId, RegistryError> {
        let mut members = self.members.write().await;
        let id = subscriber.id();

        let previous = members.remove(id);
        if previous.is_none()
            && self.config.max_subscribers > 0
            && members.live.len() >= self.config.max_subscribers
        {
            tracing::warn!(
                subscriber = %id,
                scope = %scope,
                limit = self.config.max_subscribers,
                "Subscriber rejected: limit reached"
            );
            return Err(RegistryError::Full(self.config.max_subscribers));
        }

        tracing::info!(
            subscriber = %id,
            scope = %scope,
            subscribers = members.live.len() + 1,
            "Subscriber registered"
        );

        members.insert(SubscriberEntry { subscriber, scope });
        Ok(id)
    }

    /// Remove a subscriber from every index and fire its close signal
    ///
    /// Idempotent: returns `false` if the subscriber was not registered.
    pub async fn unregister(&self, id: SubscriberId) -> bool {
        let mut members = self.members.write().await;

        match members.remove(id) {
            Some(entry) => {
                entry.subscriber.close();
                tracing::info!(
                    subscriber = %id,
                    scope = %entry.scope,
                    subscribers = members.live.len(),
                    "Subscriber unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Snapshot of untagged subscribers
    pub async fn global_subscribers(&self) -> Vec<Subscriber> {
        let members = self.members.read().await;
        members.collect(&members.global)
    }

    /// Snapshot of record subscribers for one camera label
    pub async fn label_subscribers(&self, label: &str) -> Vec<Subscriber> {
        let members = self.members.read().await;
        match members.cameras.get(label) {
            Some(ids) => members.collect(ids),
            None => Vec::new(),
        }
    }

    /// Snapshot of frame subscribers for one camera label
    pub async fn frame_subscribers(&self, label: &str) -> Vec<Subscriber> {
        let members = self.members.read().await;
        match members.frames.get(label) {
            Some(ids) => members.collect(ids),
            None => Vec::new(),
        }
    }

    /// Invoke `f` on a snapshot of the untagged subscribers
    pub async fn for_each_global<F>(&self, mut f: F)
    where
        F: FnMut(&Subscriber),
    {
        for subscriber in self.global_subscribers().await.iter() {
            f(subscriber);
        }
    }

    /// Invoke `f` on a snapshot of the record subscribers for `label`
    pub async fn for_each_with_label<F>(&self, label: &str, mut f: F)
    where
        F: FnMut(&Subscriber),
    {
        for subscriber in self.label_subscribers(label).await.iter() {
            f(subscriber);
        }
    }

    /// Check if a subscriber is registered
    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.members.read().await.live.contains_key(&id)
    }

    /// Get total number of live subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.members.read().await.live.len()
    }

    /// Get number of camera labels with at least one record subscriber
    pub async fn watched_label_count(&self) -> usize {
        self.members.read().await.cameras.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
