//! Subscriber registry for detection and frame routing
//!
//! The registry tracks every live outbound connection and which slice of
//! traffic it wants: all records, one camera's records, or one camera's raw
//! frames. Fan-out asks it for snapshots and evicts connections that fail.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<SubscriberRegistry>
//!                  ┌────────────────────────────────┐
//!                  │ live:    Id -> Subscriber      │
//!                  │ global:  {Id}                  │
//!                  │ cameras: Label -> {Id}         │
//!                  │ frames:  Label -> {Id}         │
//!                  └───────────────┬────────────────┘
//!                                  │ snapshot
//!          ┌───────────────────────┼───────────────────────┐
//!          ▼                       ▼                       ▼
//!   [Global viewer]        [CAM-1 viewer]          [CAM-1 frames]
//!   transport.send()       transport.send()        transport.send()
//! ```
//!
//! # Zero-Copy Design
//!
//! [`Outbound`] holds `bytes::Bytes`, so one serialized message is shared by
//! every recipient; cloning only bumps a reference count.

pub mod config;
pub mod store;
pub mod subscriber;

pub use config::RegistryConfig;
pub use store::SubscriberRegistry;
pub use subscriber::{Outbound, Scope, Subscriber, SubscriberId, Transport};
