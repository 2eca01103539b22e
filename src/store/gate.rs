//! Persistence gate
//!
//! Validates an ingested record and applies it to the store as a single
//! atomic append. The boolean result tells the caller whether anything
//! changed, which is the only condition under which a broadcast fires.

use std::sync::Arc;

use crate::error::AppendError;
use crate::model::{DetectionPayload, DetectionRecord};

use super::RecordStore;

/// Gate in front of a record store
pub struct PersistenceGate<P> {
    store: Arc<dyn RecordStore<P>>,
}

impl<P: DetectionPayload> PersistenceGate<P> {
    pub fn new(store: Arc<dyn RecordStore<P>>) -> Self {
        Self { store }
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<dyn RecordStore<P>> {
        &self.store
    }

    /// Append a record to the camera with this label
    ///
    /// - `Ok(true)`: camera found, record appended
    /// - `Ok(false)`: no camera with this label, nothing changed
    /// - `Err(MissingRecord)`: no record supplied, nothing changed
    /// - `Err(Store(..))`: the store failed
    pub async fn append_record(
        &self,
        label: &str,
        record: Option<&DetectionRecord<P>>,
    ) -> Result<bool, AppendError> {
        let Some(record) = record else {
            tracing::warn!(camera = %label, "Rejected empty detection record");
            return Err(AppendError::MissingRecord(label.to_string()));
        };

        let appended = self.store.append_record(label, record.clone()).await?;

        if appended {
            tracing::info!(
                camera = %label,
                timestamp = %record.timestamp,
                objects = record.payload.objects_detected(),
                "Detection record appended"
            );
        }

        Ok(appended)
    }
}
