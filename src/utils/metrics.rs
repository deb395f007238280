//! Observability and Metrics
//!
//! Process-wide counters for the secure conversation layer: chunks and
//! bytes received, messages decoded or aborted, crypto and token failures,
//! sequence anomalies and continuation point usage.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for pipeline operations
#[derive(Debug)]
pub struct Metrics {
    /// Chunks handed to a pipeline
    pub chunks_received: AtomicU64,
    /// Bytes in those chunks
    pub bytes_received: AtomicU64,
    /// Chunks rejected by a pipeline check
    pub chunks_rejected: AtomicU64,
    /// Messages decoded and dispatched
    pub messages_decoded: AtomicU64,
    /// Messages aborted by the sender
    pub messages_aborted: AtomicU64,
    /// Signature verification failures
    pub signature_failures: AtomicU64,
    /// Decryption failures
    pub decryption_failures: AtomicU64,
    /// Token renewals observed
    pub token_renewals: AtomicU64,
    /// Chunks carrying an unknown or expired token
    pub token_rejections: AtomicU64,
    /// Sequence number anomalies
    pub sequence_anomalies: AtomicU64,
    /// Unknown type ids and body decoder failures
    pub decode_errors: AtomicU64,
    /// Notification sinks that panicked
    pub dispatch_failures: AtomicU64,
    /// Continuation points created
    pub continuation_points_created: AtomicU64,
    /// Continuation points drained or cancelled
    pub continuation_points_released: AtomicU64,
    /// Lookups with an unknown continuation point
    pub continuation_points_rejected: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            chunks_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            chunks_rejected: AtomicU64::new(0),
            messages_decoded: AtomicU64::new(0),
            messages_aborted: AtomicU64::new(0),
            signature_failures: AtomicU64::new(0),
            decryption_failures: AtomicU64::new(0),
            token_renewals: AtomicU64::new(0),
            token_rejections: AtomicU64::new(0),
            sequence_anomalies: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            dispatch_failures: AtomicU64::new(0),
            continuation_points_created: AtomicU64::new(0),
            continuation_points_released: AtomicU64::new(0),
            continuation_points_rejected: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a chunk entering a pipeline
    pub fn chunk_received(&self, byte_count: usize) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    /// Record a rejected chunk
    pub fn chunk_rejected(&self) {
        self.chunks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a decoded message
    pub fn message_decoded(&self) {
        self.messages_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an aborted message
    pub fn message_aborted(&self) {
        self.messages_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn signature_failure(&self) {
        self.signature_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decryption_failure(&self) {
        self.decryption_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn token_renewed(&self) {
        self.token_renewals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn token_rejected(&self) {
        self.token_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sequence_anomaly(&self) {
        self.sequence_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dispatch_failure(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn continuation_point_created(&self) {
        self.continuation_points_created
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn continuation_point_released(&self) {
        self.continuation_points_released
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn continuation_point_rejected(&self) {
        self.continuation_points_rejected
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            chunks_rejected: self.chunks_rejected.load(Ordering::Relaxed),
            messages_decoded: self.messages_decoded.load(Ordering::Relaxed),
            messages_aborted: self.messages_aborted.load(Ordering::Relaxed),
            signature_failures: self.signature_failures.load(Ordering::Relaxed),
            decryption_failures: self.decryption_failures.load(Ordering::Relaxed),
            token_renewals: self.token_renewals.load(Ordering::Relaxed),
            token_rejections: self.token_rejections.load(Ordering::Relaxed),
            sequence_anomalies: self.sequence_anomalies.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            continuation_points_created: self.continuation_points_created.load(Ordering::Relaxed),
            continuation_points_released: self
                .continuation_points_released
                .load(Ordering::Relaxed),
            continuation_points_rejected: self
                .continuation_points_rejected
                .load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            chunks_received = snapshot.chunks_received,
            bytes_received = snapshot.bytes_received,
            chunks_rejected = snapshot.chunks_rejected,
            messages_decoded = snapshot.messages_decoded,
            messages_aborted = snapshot.messages_aborted,
            signature_failures = snapshot.signature_failures,
            decryption_failures = snapshot.decryption_failures,
            token_renewals = snapshot.token_renewals,
            token_rejections = snapshot.token_rejections,
            sequence_anomalies = snapshot.sequence_anomalies,
            decode_errors = snapshot.decode_errors,
            dispatch_failures = snapshot.dispatch_failures,
            continuation_points_created = snapshot.continuation_points_created,
            continuation_points_released = snapshot.continuation_points_released,
            continuation_points_rejected = snapshot.continuation_points_rejected,
            uptime_seconds = snapshot.uptime_seconds,
            "Secure conversation metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub chunks_received: u64,
    pub bytes_received: u64,
    pub chunks_rejected: u64,
    pub messages_decoded: u64,
    pub messages_aborted: u64,
    pub signature_failures: u64,
    pub decryption_failures: u64,
    pub token_renewals: u64,
    pub token_rejections: u64,
    pub sequence_anomalies: u64,
    pub decode_errors: u64,
    pub dispatch_failures: u64,
    pub continuation_points_created: u64,
    pub continuation_points_released: u64,
    pub continuation_points_rejected: u64,
    pub uptime_seconds: u64,
}

/// Global metrics instance (lazy static for simplicity)
static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Initialize metrics collection (call once at startup)
pub fn init_metrics() {
    let _ = global_metrics();
    info!("Metrics collection initialized");
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
