// crates/milestone-core/src/runtime/mod.rs
// ============================================================================
// Module: Milestone Runtime
// Description: Batch writer, grid diff, lifecycle and due-date services.
// Purpose: Orchestrate consistent project writes and date index reads.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the project lifecycle on top of the
//! [`crate::interfaces::KeyValueStore`] contract. Every caller surface (CLI,
//! HTTP, tests) goes through the same services so write ordering and
//! idempotency rules hold everywhere.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod batch;
pub mod diff;
pub mod due;
pub mod lifecycle;
pub mod store;
pub mod system;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::BatchRetryAuditEvent;
pub use audit::FileAuditSink;
pub use audit::LifecycleAuditEvent;
pub use audit::LifecycleOperation;
pub use audit::LifecycleOutcome;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::WriteCounts;
pub use batch::BatchWriteError;
pub use batch::BatchWriteReport;
pub use batch::BatchWriter;
pub use batch::BatchWriterConfig;
pub use batch::Deadline;
pub use batch::RetryPolicy;
pub use diff::DiffTarget;
pub use diff::GridDiff;
pub use diff::diff_grid;
pub use diff::diff_grid_resuming;
pub use diff::materialize_grid;
pub use due::DueDateConfig;
pub use due::DueDatePage;
pub use due::DueDateRange;
pub use due::DueDateService;
pub use lifecycle::ConflictKind;
pub use lifecycle::CreateClaim;
pub use lifecycle::CreateProjectRequest;
pub use lifecycle::ExpectedState;
pub use lifecycle::OperationContext;
pub use lifecycle::ProjectError;
pub use lifecycle::ProjectService;
pub use lifecycle::ProjectSummary;
pub use lifecycle::ProjectView;
pub use lifecycle::UpdateProjectRequest;
pub use store::BatchFault;
pub use store::InMemoryKeyValueStore;
pub use store::SharedKeyValueStore;
pub use store::StoreStats;
pub use system::FixedClock;
pub use system::SystemClock;
pub use system::ThreadSleeper;
