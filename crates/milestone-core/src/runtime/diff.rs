// crates/milestone-core/src/runtime/diff.rs
// ============================================================================
// Module: Grid Diff Engine
// Description: Minimal puts and deletes between stored cells and a desired grid.
// Purpose: Keep milestone cells and their date index mirror in lockstep.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! [`diff_grid`] compares the stored milestone cells of a project with the
//! caller's desired [`Grid`] and produces four lists: milestone puts, milestone
//! deletes, date index puts, and date index deletes. The engine is pure; the
//! lifecycle service decides ordering and submission.
//!
//! A date change moves the mirror to a new date partition, so it emits a date
//! delete for the old partition plus puts for both collections. A change of
//! stage description or project name alone rewrites both records in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::CellKey;
use crate::core::DateIndexEntry;
use crate::core::Grid;
use crate::core::ItemKey;
use crate::core::MilestoneCell;
use crate::core::ProjectId;
use crate::core::ProjectName;
use crate::core::Timestamp;
use crate::runtime::audit::WriteCounts;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Project identity stamped onto every written record.
#[derive(Debug, Clone, Copy)]
pub struct DiffTarget<'a> {
    /// Project identifier.
    pub project_id: &'a ProjectId,
    /// Project name copied onto cells and mirrors.
    pub project_name: &'a ProjectName,
    /// Write time for new records.
    pub updated_at: Timestamp,
}

/// Writes required to move stored cells to a desired grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridDiff {
    /// Cells to insert or overwrite.
    pub milestone_puts: Vec<MilestoneCell>,
    /// Cells to remove.
    pub milestone_deletes: Vec<ItemKey>,
    /// Date index entries to insert or overwrite.
    pub date_puts: Vec<DateIndexEntry>,
    /// Date index entries to remove.
    pub date_deletes: Vec<ItemKey>,
}

impl GridDiff {
    /// Returns true when no write is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.milestone_puts.is_empty()
            && self.milestone_deletes.is_empty()
            && self.date_puts.is_empty()
            && self.date_deletes.is_empty()
    }

    /// Returns per-collection write counts.
    #[must_use]
    pub fn counts(&self) -> WriteCounts {
        WriteCounts {
            milestone_puts: self.milestone_puts.len(),
            milestone_deletes: self.milestone_deletes.len(),
            date_puts: self.date_puts.len(),
            date_deletes: self.date_deletes.len(),
        }
    }
}

// ============================================================================
// SECTION: Diff
// ============================================================================

/// Computes the writes that turn `existing` into `desired`.
///
/// Stored cells absent from `desired` are deleted along with their mirrors.
#[must_use]
pub fn diff_grid(existing: &[MilestoneCell], desired: &Grid, target: DiffTarget<'_>) -> GridDiff {
    let stored: BTreeMap<CellKey, &MilestoneCell> =
        existing.iter().map(|cell| (cell.cell_key(), cell)).collect();
    let mut diff = GridDiff::default();

    for (key, old) in &stored {
        if desired.get(key).is_none() {
            diff.date_deletes.push(old.mirror_key());
            diff.milestone_deletes.push(old.item_key());
        }
    }

    for (key, entry) in desired.iter() {
        let cell = MilestoneCell::new(
            target.project_id,
            target.project_name,
            *key,
            entry,
            target.updated_at,
        );
        match stored.get(key) {
            None => push_cell(&mut diff, cell),
            Some(old) if old.date != entry.date => {
                diff.date_deletes.push(old.mirror_key());
                push_cell(&mut diff, cell);
            }
            Some(old)
                if old.stage_description != entry.stage_description
                    || old.project_name != *target.project_name =>
            {
                push_cell(&mut diff, cell);
            }
            Some(_) => {}
        }
    }
    diff
}

/// Builds the writes that materialize a grid for a new project.
#[must_use]
pub fn materialize_grid(desired: &Grid, target: DiffTarget<'_>) -> GridDiff {
    diff_grid(&[], desired, target)
}

/// Computes the diff for a resumed operation.
///
/// Identical to [`diff_grid`], except that stored cells kept unchanged also
/// get their mirror re-put, since an interrupted run may have written the cell
/// without its date index entry.
#[must_use]
pub fn diff_grid_resuming(
    existing: &[MilestoneCell],
    desired: &Grid,
    target: DiffTarget<'_>,
) -> GridDiff {
    let mut diff = diff_grid(existing, desired, target);
    let rewritten: BTreeSet<CellKey> =
        diff.milestone_puts.iter().map(MilestoneCell::cell_key).collect();
    for cell in existing {
        let key = cell.cell_key();
        if desired.get(&key).is_some() && !rewritten.contains(&key) {
            diff.date_puts.push(cell.mirror());
        }
    }
    diff
}

/// Records a cell put together with its mirror put.
fn push_cell(diff: &mut GridDiff, cell: MilestoneCell) {
    diff.date_puts.push(cell.mirror());
    diff.milestone_puts.push(cell);
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use super::*;
    use crate::core::CellEntry;
    use crate::core::Gate;
    use crate::core::MilestoneDate;
    use crate::core::Phase;
    use crate::core::Stage;

    fn cell_key(stage: u8, gate: Gate, phase: Phase) -> CellKey {
        CellKey::new(Stage::new(stage).unwrap(), gate, phase)
    }

    fn entry(date: &str, description: &str) -> CellEntry {
        CellEntry {
            date: MilestoneDate::parse(date).unwrap(),
            stage_description: description.to_string(),
        }
    }

    #[test]
    fn empty_to_empty_is_noop() {
        let id = ProjectId::parse("p1").unwrap();
        let name = ProjectName::parse("Project").unwrap();
        let target = DiffTarget {
            project_id: &id,
            project_name: &name,
            updated_at: Timestamp::from_unix_millis(1),
        };
        assert!(diff_grid(&[], &Grid::new(), target).is_empty());
    }

    #[test]
    fn removed_cell_deletes_cell_and_mirror() {
        let id = ProjectId::parse("p1").unwrap();
        let name = ProjectName::parse("Project").unwrap();
        let target = DiffTarget {
            project_id: &id,
            project_name: &name,
            updated_at: Timestamp::from_unix_millis(1),
        };
        let key = cell_key(2, Gate::Elet, Phase::Sop);
        let old = MilestoneCell::new(&id, &name, key, &entry("2026-03-01", "s2"), target.updated_at);
        let diff = diff_grid(std::slice::from_ref(&old), &Grid::new(), target);
        assert_eq!(diff.milestone_deletes, vec![old.item_key()]);
        assert_eq!(diff.date_deletes, vec![old.mirror_key()]);
        assert!(diff.milestone_puts.is_empty());
        assert!(diff.date_puts.is_empty());
    }
}
