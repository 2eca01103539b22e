//! In-memory record store
//!
//! Cameras live in a label-keyed map; each camera sits behind its own lock so
//! appends to different labels never contend, and appends to the same label
//! are serialized rather than racing a read-modify-write.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::model::{Camera, CameraDetails, DetectionPayload, DetectionRecord, NewCamera};

use super::RecordStore;

/// Thread-safe in-memory camera store
pub struct MemoryStore<P> {
    cameras: RwLock<HashMap<String, Arc<RwLock<Camera<P>>>>>,
}

impl<P: DetectionPayload> MemoryStore<P> {
    pub fn new() -> Self {
        Self {
            cameras: RwLock::new(HashMap::new()),
        }
    }

    /// Get total number of cameras
    pub async fn camera_count(&self) -> usize {
        self.cameras.read().await.len()
    }

    async fn snapshot(&self) -> Vec<Camera<P>> {
        let cameras = self.cameras.read().await;
        let mut out = Vec::with_capacity(cameras.len());

        for entry in cameras.values() {
            out.push(entry.read().await.clone());
        }

        out.sort_by(|a, b| a.label.cmp(&b.label));
        out
    }
}

impl<P: DetectionPayload> Default for MemoryStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: DetectionPayload> RecordStore<P> for MemoryStore<P> {
    async fn create_camera(&self, camera: NewCamera) -> Result<Camera<P>, StoreError> {
        let mut cameras = self.cameras.write().await;

        if cameras.contains_key(&camera.label) {
            return Err(StoreError::AlreadyExists(camera.label));
        }

        let camera = Camera::new(camera);
        cameras.insert(camera.label.clone(), Arc::new(RwLock::new(camera.clone())));

        tracing::info!(
            camera = %camera.label,
            location = ?camera.location,
            status = ?camera.status,
            "Camera created"
        );

        Ok(camera)
    }

    async fn find_by_label(&self, label: &str) -> Result<Option<Camera<P>>, StoreError> {
        let cameras = self.cameras.read().await;

        match cameras.get(label) {
            Some(entry) => Ok(Some(entry.read().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_cameras(&self, active_only: bool) -> Result<Vec<Camera<P>>, StoreError> {
        let mut cameras = self.snapshot().await;
        if active_only {
            cameras.retain(|c| c.is_active());
        }
        Ok(cameras)
    }

    async fn camera_details(&self) -> Result<Vec<CameraDetails>, StoreError> {
        Ok(self.snapshot().await.iter().map(Camera::details).collect())
    }

    async fn append_record(
        &self,
        label: &str,
        record: DetectionRecord<P>,
    ) -> Result<bool, StoreError> {
        let cameras = self.cameras.read().await;

        let Some(entry) = cameras.get(label) else {
            return Ok(false);
        };

        entry.write().await.records.push(record);
        Ok(true)
    }
}
