//! Detection records and payload shapes
//!
//! Two record shapes exist in deployed data: a flat object count and a list
//! of per-category counts. A deployment picks exactly one via [`RecordShape`];
//! the rest of the pipeline is generic over the [`DetectionPayload`] it chose.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Which detection payload a deployment stores and broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordShape {
    /// `{"objectsDetected": n}`
    Flat,
    /// `{"categories": [{"category": "car", "objectsDetected": n}, ...]}`
    #[default]
    Categorized,
}

impl fmt::Display for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordShape::Flat => write!(f, "flat"),
            RecordShape::Categorized => write!(f, "categorized"),
        }
    }
}

impl FromStr for RecordShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(RecordShape::Flat),
            "categorized" | "categories" => Ok(RecordShape::Categorized),
            other => Err(format!("unknown record shape: {}", other)),
        }
    }
}

/// Payload carried by a detection record
pub trait DetectionPayload:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Shape this payload serializes as
    const SHAPE: RecordShape;

    /// Total number of objects detected across all categories
    fn objects_detected(&self) -> u32;
}

/// Flat object count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCount {
    #[serde(rename = "objectsDetected")]
    pub objects_detected: u32,
}

impl ObjectCount {
    pub fn new(objects_detected: u32) -> Self {
        Self { objects_detected }
    }
}

impl DetectionPayload for ObjectCount {
    const SHAPE: RecordShape = RecordShape::Flat;

    fn objects_detected(&self) -> u32 {
        self.objects_detected
    }
}

/// Object count for a single category (e.g. "car", "truck")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    #[serde(rename = "objectsDetected")]
    pub objects_detected: u32,
}

impl CategoryCount {
    pub fn new(category: impl Into<String>, objects_detected: u32) -> Self {
        Self {
            category: category.into(),
            objects_detected,
        }
    }
}

/// Per-category object counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Categories {
    pub categories: Vec<CategoryCount>,
}

impl Categories {
    pub fn new(categories: Vec<CategoryCount>) -> Self {
        Self { categories }
    }
}

impl DetectionPayload for Categories {
    const SHAPE: RecordShape = RecordShape::Categorized;

    fn objects_detected(&self) -> u32 {
        self.categories
            .iter()
            .map(|c| c.objects_detected)
            .fold(0u32, u32::saturating_add)
    }
}

/// One timestamped observation for a camera
///
/// Records are immutable once appended to a camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord<P> {
    /// String-formatted instant, as produced by the camera
    pub timestamp: String,

    #[serde(flatten)]
    pub payload: P,
}

impl<P: DetectionPayload> DetectionRecord<P> {
    pub fn new(timestamp: impl Into<String>, payload: P) -> Self {
        Self {
            timestamp: timestamp.into(),
            payload,
        }
    }
}
