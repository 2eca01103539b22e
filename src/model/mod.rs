//! Domain model
//!
//! This module provides:
//! - Cameras and camera creation requests
//! - Detection records in both payload shapes
//! - Producer events (detections and raw frames)
//! - Wire encoding for broadcast

pub mod camera;
pub mod event;
pub mod record;
pub mod wire;

pub use camera::{Camera, CameraDetails, NewCamera, STATUS_ACTIVE};
pub use event::{DetectionEvent, FrameEvent};
pub use record::{
    Categories, CategoryCount, DetectionPayload, DetectionRecord, ObjectCount, RecordShape,
};
pub use wire::{encode_record, WireRecord};
