// crates/milestone-core/src/runtime/audit.rs
// ============================================================================
// Module: Lifecycle Audit Logging
// Description: Structured audit events for project lifecycle and batch retries.
// Purpose: Emit JSON-line audit logs without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for project writes.
//! Events are plain serializable structs so deployments can route them to
//! their preferred logging pipeline; the runtime only depends on the
//! [`AuditSink`] trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle operation label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleOperation {
    /// Project creation.
    Create,
    /// Grid update.
    Update,
}

/// Lifecycle outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleOutcome {
    /// Writes were applied and the project is active.
    Applied,
    /// Same request already completed; nothing written.
    Replayed,
    /// Interrupted request resumed and completed.
    Resumed,
    /// Request rejected with a conflict or validation error.
    Rejected,
    /// Request failed after starting writes.
    Failed,
}

/// Project lifecycle audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation performed.
    pub operation: LifecycleOperation,
    /// Project identifier.
    pub project_id: String,
    /// Idempotency key of the request.
    pub request_id: String,
    /// Request outcome.
    pub outcome: LifecycleOutcome,
    /// Milestone cells written.
    pub milestone_puts: usize,
    /// Milestone cells deleted.
    pub milestone_deletes: usize,
    /// Date index entries written.
    pub date_puts: usize,
    /// Date index entries deleted.
    pub date_deletes: usize,
    /// Error or rejection detail.
    pub detail: Option<String>,
}

/// Inputs required to construct a lifecycle audit event.
pub struct LifecycleAuditEventParams {
    /// Operation performed.
    pub operation: LifecycleOperation,
    /// Project identifier.
    pub project_id: String,
    /// Idempotency key of the request.
    pub request_id: String,
    /// Request outcome.
    pub outcome: LifecycleOutcome,
    /// Per-collection write counts.
    pub writes: WriteCounts,
    /// Error or rejection detail.
    pub detail: Option<String>,
}

/// Per-collection write counts for one lifecycle operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteCounts {
    /// Milestone cells written.
    pub milestone_puts: usize,
    /// Milestone cells deleted.
    pub milestone_deletes: usize,
    /// Date index entries written.
    pub date_puts: usize,
    /// Date index entries deleted.
    pub date_deletes: usize,
}

/// Batch retry audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRetryAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Retry attempt number (1-based).
    pub attempt: u32,
    /// Requests still unprocessed.
    pub unprocessed: usize,
    /// Backoff delay before the retry.
    pub delay_ms: u128,
}

impl LifecycleAuditEvent {
    /// Creates a new lifecycle audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: LifecycleAuditEventParams) -> Self {
        Self {
            event: "project_lifecycle",
            timestamp_ms: unix_millis(),
            operation: params.operation,
            project_id: params.project_id,
            request_id: params.request_id,
            outcome: params.outcome,
            milestone_puts: params.writes.milestone_puts,
            milestone_deletes: params.writes.milestone_deletes,
            date_puts: params.writes.date_puts,
            date_deletes: params.writes.date_deletes,
            detail: params.detail,
        }
    }
}

impl BatchRetryAuditEvent {
    /// Creates a new batch retry audit event with a consistent timestamp.
    #[must_use]
    pub fn new(attempt: u32, unprocessed: usize, delay_ms: u128) -> Self {
        Self {
            event: "batch_retry",
            timestamp_ms: unix_millis(),
            attempt,
            unprocessed,
            delay_ms,
        }
    }
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for lifecycle events.
pub trait AuditSink: Send + Sync {
    /// Record a lifecycle event.
    fn record_lifecycle(&self, event: &LifecycleAuditEvent);

    /// Record a batch retry event.
    fn record_batch_retry(&self, _event: &BatchRetryAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_batch_retry(&self, event: &BatchRetryAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized line.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        self.append(event);
    }

    fn record_batch_retry(&self, event: &BatchRetryAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_lifecycle(&self, _event: &LifecycleAuditEvent) {}
}

/// Audit sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded lifecycle events.
    lifecycle: Mutex<Vec<LifecycleAuditEvent>>,
    /// Recorded batch retry events.
    retries: Mutex<Vec<BatchRetryAuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns recorded lifecycle events.
    #[must_use]
    pub fn lifecycle_events(&self) -> Vec<LifecycleAuditEvent> {
        self.lifecycle.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns recorded batch retry events.
    #[must_use]
    pub fn retry_events(&self) -> Vec<BatchRetryAuditEvent> {
        self.retries.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        if let Ok(mut events) = self.lifecycle.lock() {
            events.push(event.clone());
        }
    }

    fn record_batch_retry(&self, event: &BatchRetryAuditEvent) {
        if let Ok(mut events) = self.retries.lock() {
            events.push(event.clone());
        }
    }
}
