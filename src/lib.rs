//! Traffic camera detection ingestion and real-time fan-out
//!
//! Detection events arrive from producers, are appended to the owning
//! camera's record list, and every persisted record is pushed to all global
//! subscribers plus the subscribers watching that camera. Raw camera frames
//! bypass persistence and go straight to the camera's frame topic.
//!
//! ```text
//! producer ─▶ DetectionPipeline ─▶ PersistenceGate ─▶ RecordStore
//!                     │ (appended)
//!                     ▼
//!               Broadcaster ─▶ SubscriberRegistry ─▶ websocket viewers
//!                     ▲
//! producer ─▶ FramePipeline
//! ```

pub mod broadcast;
pub mod error;
pub mod ingest;
pub mod model;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod store;

pub use broadcast::{Broadcaster, Delivery};
pub use error::{Error, Result};
pub use model::{Categories, DetectionEvent, DetectionRecord, FrameEvent, NewCamera, ObjectCount};
pub use registry::{RegistryConfig, SubscriberRegistry};
pub use server::{ServerConfig, TrafficServer};
pub use store::{MemoryStore, PersistenceGate, RecordStore};
