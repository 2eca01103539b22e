//! Stream ingestion
//!
//! Two independent pipelines consume producer events:
//! - [`DetectionPipeline`]: detection event → persistence gate → broadcast
//! - [`FramePipeline`]: raw frame → frame-topic broadcast

pub mod detections;
pub mod frames;
pub mod source;

pub use detections::{DetectionPipeline, IngestOutcome};
pub use frames::FramePipeline;
pub use source::{ChannelSource, EventSource};
