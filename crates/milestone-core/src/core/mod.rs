// crates/milestone-core/src/core/mod.rs
// ============================================================================
// Module: Milestone Core Types
// Description: Identifiers, dates, grid, keys, and stored record types.
// Purpose: Provide stable, serializable types for the milestone keyspace.
// Dependencies: serde, serde_json, time, uuid
// ============================================================================

//! ## Overview
//! Core types are pure data: no storage access and no wall-clock reads. They
//! define the caller grid model and the three record kinds persisted in the
//! partitioned key-value store.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod date;
pub mod grid;
pub mod identifiers;
pub mod item;
pub mod keys;
pub mod records;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use date::DateError;
pub use date::MilestoneDate;
pub use grid::CellEntry;
pub use grid::CellKey;
pub use grid::Gate;
pub use grid::Grid;
pub use grid::GridDocument;
pub use grid::GridError;
pub use grid::MAX_GRID_CELLS;
pub use grid::Phase;
pub use grid::Stage;
pub use grid::StageDocument;
pub use identifiers::IdentifierError;
pub use identifiers::ProjectId;
pub use identifiers::ProjectName;
pub use identifiers::RequestId;
pub use item::Attributes;
pub use item::Item;
pub use item::ItemKey;
pub use item::RecordError;
pub use records::DateIndexEntry;
pub use records::MilestoneCell;
pub use records::ProjectMeta;
pub use records::ProjectStatus;
pub use records::grid_from_cells;
pub use time::Timestamp;
