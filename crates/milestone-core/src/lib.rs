// crates/milestone-core/src/lib.rs
// ============================================================================
// Module: Milestone Core Library
// Description: Public API surface for the milestone tracker core.
// Purpose: Expose core types, store interfaces, and runtime services.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Milestone core tracks per-project milestone dates on a stage x gate x phase
//! grid and mirrors every populated cell into a date-ordered index. Writes go
//! through an idempotent, resumable lifecycle service; the storage backend is
//! any [`KeyValueStore`] implementation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::CellEntry;
pub use self::core::CellKey;
pub use self::core::DateError;
pub use self::core::DateIndexEntry;
pub use self::core::Gate;
pub use self::core::Grid;
pub use self::core::GridDocument;
pub use self::core::GridError;
pub use self::core::IdentifierError;
pub use self::core::Item;
pub use self::core::ItemKey;
pub use self::core::MilestoneCell;
pub use self::core::MilestoneDate;
pub use self::core::Phase;
pub use self::core::ProjectId;
pub use self::core::ProjectMeta;
pub use self::core::ProjectName;
pub use self::core::ProjectStatus;
pub use self::core::RequestId;
pub use self::core::Stage;
pub use self::core::StageDocument;
pub use self::core::Timestamp;
pub use interfaces::Clock;
pub use interfaces::Condition;
pub use interfaces::ConditionalWrite;
pub use interfaces::KeyValueStore;
pub use interfaces::QueryPage;
pub use interfaces::QueryRequest;
pub use interfaces::ReadConsistency;
pub use interfaces::Sleeper;
pub use interfaces::SortKeyCondition;
pub use interfaces::StoreError;
pub use interfaces::WriteRequest;
pub use runtime::BatchWriter;
pub use runtime::BatchWriterConfig;
pub use runtime::DueDateConfig;
pub use runtime::DueDateService;
pub use runtime::InMemoryKeyValueStore;
pub use runtime::OperationContext;
pub use runtime::ProjectError;
pub use runtime::ProjectService;
pub use runtime::RetryPolicy;
pub use runtime::SharedKeyValueStore;
