//! Counters for the ingestion and fan-out pipelines

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live pipeline counters, shared by ingestion workers and fan-out
#[derive(Debug)]
pub struct PipelineStats {
    started_at: Instant,
    events_received: AtomicU64,
    records_appended: AtomicU64,
    unknown_camera: AtomicU64,
    store_failures: AtomicU64,
    rejected_input: AtomicU64,
    frames_received: AtomicU64,
    messages_delivered: AtomicU64,
    frames_delivered: AtomicU64,
    subscribers_evicted: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            events_received: AtomicU64::new(0),
            records_appended: AtomicU64::new(0),
            unknown_camera: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            rejected_input: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            messages_delivered: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            subscribers_evicted: AtomicU64::new(0),
        }
    }

    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_appended(&self) {
        self.records_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_camera(&self) {
        self.unknown_camera.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected_input.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_messages_delivered(&self, n: usize) {
        self.messages_delivered.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_frames_delivered(&self, n: usize) {
        self.frames_delivered.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, n: usize) {
        self.subscribers_evicted.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            events_received: self.events_received.load(Ordering::Relaxed),
            records_appended: self.records_appended.load(Ordering::Relaxed),
            unknown_camera: self.unknown_camera.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            rejected_input: self.rejected_input.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            subscribers_evicted: self.subscribers_evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of the pipeline counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    /// Detection events pulled from the source
    pub events_received: u64,
    /// Records persisted
    pub records_appended: u64,
    /// Events for labels with no camera
    pub unknown_camera: u64,
    /// Events dropped because the store failed
    pub store_failures: u64,
    /// Malformed events, missing records and empty frames
    pub rejected_input: u64,
    /// Frame events pulled from the source
    pub frames_received: u64,
    /// Record messages written to subscribers
    pub messages_delivered: u64,
    /// Frame messages written to subscribers
    pub frames_delivered: u64,
    /// Subscribers dropped after a failed send
    pub subscribers_evicted: u64,
}

impl StatsSnapshot {
    /// Events that did not result in a persisted record
    pub fn dropped_events(&self) -> u64 {
        self.unknown_camera + self.store_failures
    }

    /// Persisted records per second since startup
    pub fn append_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.records_appended as f64 / secs
        } else {
            0.0
        }
    }
}
