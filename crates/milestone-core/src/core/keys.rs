// crates/milestone-core/src/core/keys.rs
// ============================================================================
// Module: Project Key Scheme
// Description: Partition and sort key builders for all project item kinds.
// Purpose: Keep read and write paths in exact key agreement.
// Dependencies: crate::core::{date, grid, identifiers}
// ============================================================================

//! ## Overview
//! Three item kinds share one `(pk, sk)` keyspace:
//!
//! | Item | PK | SK |
//! |------|----|----|
//! | Project metadata | `PROJECT#{id}` | `META` |
//! | Milestone cell | `PROJECT#{id}` | `MS#ALS{stage}#GATE#{gate}#PHASE#{phase}` |
//! | Date index entry | `DATE#{date}` | `PROJECT#{id}#ALS{stage}#GATE#{gate}#PHASE#{phase}` |
//!
//! Every reader and writer derives keys through these functions; a mismatch
//! would orphan rows without any error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::date::MilestoneDate;
use crate::core::grid::CellKey;
use crate::core::identifiers::ProjectId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Partition prefix for project-scoped items.
pub const PROJECT_PREFIX: &str = "PROJECT#";
/// Partition prefix for date index items.
pub const DATE_PREFIX: &str = "DATE#";
/// Sort key of the metadata item.
pub const META_SORT_KEY: &str = "META";
/// Sort key prefix shared by all milestone cells of a project.
pub const MILESTONE_SORT_PREFIX: &str = "MS#";

// ============================================================================
// SECTION: Key Builders
// ============================================================================

/// Partition key holding a project's metadata and milestone cells.
#[must_use]
pub fn project_partition(project_id: &ProjectId) -> String {
    format!("{PROJECT_PREFIX}{project_id}")
}

/// Sort key of the project metadata item.
#[must_use]
pub const fn meta_sort() -> &'static str {
    META_SORT_KEY
}

/// Sort key of a milestone cell within its project partition.
#[must_use]
pub fn milestone_sort(cell: &CellKey) -> String {
    format!("{MILESTONE_SORT_PREFIX}{}", cell_suffix(cell))
}

/// Partition key of the date index for one calendar day.
#[must_use]
pub fn date_partition(date: &MilestoneDate) -> String {
    format!("{DATE_PREFIX}{date}")
}

/// Sort key of a date index entry within its date partition.
#[must_use]
pub fn date_sort(project_id: &ProjectId, cell: &CellKey) -> String {
    format!("{PROJECT_PREFIX}{project_id}#{}", cell_suffix(cell))
}

/// Shared `ALS{stage}#GATE#{gate}#PHASE#{phase}` suffix.
fn cell_suffix(cell: &CellKey) -> String {
    format!("ALS{}#GATE#{}#PHASE#{}", cell.stage, cell.gate, cell.phase)
}
