//! Events delivered by an event source

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::record::{DetectionPayload, DetectionRecord};

/// A detection event as produced by a camera
///
/// Same JSON shape as the broadcast wire message. The timestamp may be
/// missing on malformed producers; such events carry no usable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent<P> {
    pub label: String,

    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(flatten)]
    pub payload: P,
}

impl<P: DetectionPayload> DetectionEvent<P> {
    pub fn new(label: impl Into<String>, timestamp: impl Into<String>, payload: P) -> Self {
        Self {
            label: label.into(),
            timestamp: Some(timestamp.into()),
            payload,
        }
    }

    /// Split into the camera label and the record to persist
    ///
    /// The record is `None` when the event has no timestamp.
    pub fn into_record(self) -> (String, Option<DetectionRecord<P>>) {
        let record = self
            .timestamp
            .filter(|ts| !ts.trim().is_empty())
            .map(|ts| DetectionRecord::new(ts, self.payload));

        (self.label, record)
    }
}

/// A raw camera frame (typically JPEG) keyed by camera label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub label: String,
    pub frame: Bytes,
}

impl FrameEvent {
    pub fn new(label: impl Into<String>, frame: impl Into<Bytes>) -> Self {
        Self {
            label: label.into(),
            frame: frame.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::{Categories, CategoryCount, ObjectCount};

    #[test]
    fn test_decode_producer_message() {
        let json = r#"{
            "label": "CAM-1",
            "timestamp": "2024-05-01T10:00:00.123456",
            "categories": [{"category": "car", "objectsDetected": 2}]
        }"#;
        let event: DetectionEvent<Categories> = serde_json::from_str(json).unwrap();

        let (label, record) = event.into_record();
        assert_eq!(label, "CAM-1");
        let record = record.unwrap();
        assert_eq!(record.payload.categories, vec![CategoryCount::new("car", 2)]);
    }

    #[test]
    fn test_missing_timestamp_has_no_record() {
        let json = r#"{"label": "CAM-1", "objectsDetected": 2}"#;
        let event: DetectionEvent<ObjectCount> = serde_json::from_str(json).unwrap();

        let (label, record) = event.into_record();
        assert_eq!(label, "CAM-1");
        assert!(record.is_none());
    }

    #[test]
    fn test_blank_timestamp_has_no_record() {
        let event = DetectionEvent::new("CAM-1", "  ", ObjectCount::new(1));
        assert!(event.into_record().1.is_none());
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let json = r#"{"label": "CAM-1", "timestamp": "t", "objectsDetected": 2}"#;
        assert!(serde_json::from_str::<DetectionEvent<Categories>>(json).is_err());
    }
}
