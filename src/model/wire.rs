//! Wire encoding for broadcast messages
//!
//! A record is serialized exactly once per publish; every recipient gets a
//! reference-counted clone of the same `Bytes`.

use bytes::Bytes;
use serde::Serialize;

use super::record::{DetectionPayload, DetectionRecord};

/// Broadcast message: `{label, timestamp, <payload fields>}`
#[derive(Debug, Serialize)]
pub struct WireRecord<'a, P> {
    pub label: &'a str,

    #[serde(flatten)]
    pub record: &'a DetectionRecord<P>,
}

/// Serialize a record for broadcast
pub fn encode_record<P: DetectionPayload>(
    label: &str,
    record: &DetectionRecord<P>,
) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(&WireRecord { label, record }).map(Bytes::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::{Categories, CategoryCount, ObjectCount};

    #[test]
    fn test_encode_categorized() {
        let record = DetectionRecord::new(
            "2024-05-01T10:00:00",
            Categories::new(vec![CategoryCount::new("car", 3), CategoryCount::new("person", 1)]),
        );
        let bytes = encode_record("CAM-1", &record).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "label": "CAM-1",
                "timestamp": "2024-05-01T10:00:00",
                "categories": [
                    {"category": "car", "objectsDetected": 3},
                    {"category": "person", "objectsDetected": 1}
                ]
            })
        );
    }

    #[test]
    fn test_encode_flat() {
        let record = DetectionRecord::new("2024-05-01T10:00:00", ObjectCount::new(9));
        let bytes = encode_record("CAM-2", &record).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "label": "CAM-2",
                "timestamp": "2024-05-01T10:00:00",
                "objectsDetected": 9
            })
        );
        assert!(json.get("categories").is_none());
    }
}
