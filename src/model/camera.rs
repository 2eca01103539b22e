//! Camera entities

use serde::{Deserialize, Serialize};

use super::record::DetectionRecord;

/// Status value marking a camera as active
pub const STATUS_ACTIVE: &str = "Active";

/// A traffic camera and its detection history
///
/// The label is the camera's identity: persistence, record routing and
/// frame topics are all keyed by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera<P> {
    pub label: String,
    pub location: Option<String>,
    pub status: Option<String>,
    pub resolution: Option<String>,
    /// Detection records in arrival order
    pub records: Vec<DetectionRecord<P>>,
}

impl<P> Camera<P> {
    /// Create a camera with an empty record list
    pub fn new(camera: NewCamera) -> Self {
        Self {
            label: camera.label,
            location: camera.location,
            status: camera.status,
            resolution: camera.resolution,
            records: Vec::new(),
        }
    }

    /// Check if the camera's status is "Active"
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some(STATUS_ACTIVE)
    }

    /// Display metadata without the record history
    pub fn details(&self) -> CameraDetails {
        CameraDetails {
            label: self.label.clone(),
            location: self.location.clone(),
            status: self.status.clone(),
            resolution: self.resolution.clone(),
        }
    }
}

/// Camera creation request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCamera {
    pub label: String,
    pub location: Option<String>,
    pub status: Option<String>,
    pub resolution: Option<String>,
}

impl NewCamera {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }
}

/// Camera metadata without records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDetails {
    pub label: String,
    pub location: Option<String>,
    pub status: Option<String>,
    pub resolution: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::ObjectCount;

    #[test]
    fn test_new_camera_has_no_records() {
        let camera: Camera<ObjectCount> = Camera::new(
            NewCamera::new("CAM-1")
                .location("Main St & 5th")
                .status(STATUS_ACTIVE)
                .resolution("1920x1080"),
        );

        assert_eq!(camera.label, "CAM-1");
        assert!(camera.records.is_empty());
        assert!(camera.is_active());
    }

    #[test]
    fn test_details_drop_records() {
        let camera: Camera<ObjectCount> = Camera::new(NewCamera::new("CAM-2").status("Offline"));
        let details = camera.details();

        assert_eq!(details.label, "CAM-2");
        assert_eq!(details.status.as_deref(), Some("Offline"));
        assert!(!camera.is_active());
    }
}
