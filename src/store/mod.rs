//! Record persistence
//!
//! The [`RecordStore`] trait is the seam to the database. [`MemoryStore`] is
//! the in-process implementation used by the binary and the tests.
//! [`PersistenceGate`] sits in front of a store and decides whether an
//! ingested event produced a real change worth broadcasting.

pub mod gate;
pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Camera, CameraDetails, DetectionPayload, DetectionRecord, NewCamera};

pub use gate::PersistenceGate;
pub use memory::MemoryStore;

/// Storage for cameras and their detection records
///
/// Implementations report a missing camera as `Ok(None)` / `Ok(false)` and
/// reserve `Err` for store failures.
#[async_trait]
pub trait RecordStore<P: DetectionPayload>: Send + Sync {
    /// Create a camera with an empty record list
    async fn create_camera(&self, camera: NewCamera) -> Result<Camera<P>, StoreError>;

    /// Look up a camera (with records) by label
    async fn find_by_label(&self, label: &str) -> Result<Option<Camera<P>>, StoreError>;

    /// List cameras, optionally only those with status "Active"
    async fn list_cameras(&self, active_only: bool) -> Result<Vec<Camera<P>>, StoreError>;

    /// Metadata for every camera, without records
    async fn camera_details(&self) -> Result<Vec<CameraDetails>, StoreError>;

    /// Atomically append a record to the camera's record list
    ///
    /// Returns `Ok(false)` if no camera has this label.
    async fn append_record(
        &self,
        label: &str,
        record: DetectionRecord<P>,
    ) -> Result<bool, StoreError>;
}
