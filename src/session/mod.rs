//! Subscriber connection sessions

pub mod state;

pub use state::{ConnectionPhase, SubscriberSession};
