// crates/milestone-core/src/core/records.rs
// ============================================================================
// Module: Project Records
// Description: Typed project metadata, milestone cell, and date index records.
// Purpose: Define the three item kinds sharing the project keyspace.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! A project is stored as one [`ProjectMeta`], one [`MilestoneCell`] per
//! populated grid cell, and one [`DateIndexEntry`] mirroring each cell under
//! its date partition. A mirror exists iff its cell exists with the same date.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::date::MilestoneDate;
use crate::core::grid::CellEntry;
use crate::core::grid::CellKey;
use crate::core::grid::Gate;
use crate::core::grid::Grid;
use crate::core::grid::Phase;
use crate::core::grid::Stage;
use crate::core::identifiers::ProjectId;
use crate::core::identifiers::ProjectName;
use crate::core::identifiers::RequestId;
use crate::core::item::Item;
use crate::core::item::ItemKey;
use crate::core::item::RecordError;
use crate::core::item::verify_key;
use crate::core::keys;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Attribute Names
// ============================================================================

/// Metadata attribute holding the lifecycle status.
pub const STATUS_ATTRIBUTE: &str = "status";
/// Metadata attribute holding the last accepted idempotency key.
pub const LAST_REQUEST_ID_ATTRIBUTE: &str = "lastRequestId";
/// Attribute holding the last update time.
pub const UPDATED_AT_ATTRIBUTE: &str = "updatedAt";

// ============================================================================
// SECTION: Project Metadata
// ============================================================================

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    /// Initial materialization in flight.
    Creating,
    /// Stable state.
    Active,
    /// Grid update in flight.
    Updating,
}

impl ProjectStatus {
    /// Returns the stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Updating => "UPDATING",
        }
    }
}

/// Project metadata record (`PROJECT#{id}` / `META`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    /// Project identifier.
    pub project_id: ProjectId,
    /// Project name.
    pub project_name: ProjectName,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Last idempotency key accepted for this project.
    pub last_request_id: RequestId,
    /// Last transition time.
    pub updated_at: Timestamp,
}

impl ProjectMeta {
    /// Key of the metadata item for a project.
    #[must_use]
    pub fn key_for(project_id: &ProjectId) -> ItemKey {
        ItemKey::new(keys::project_partition(project_id), keys::meta_sort())
    }

    /// Key of this metadata item.
    #[must_use]
    pub fn item_key(&self) -> ItemKey {
        Self::key_for(&self.project_id)
    }

    /// Encodes the record as a store item.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when encoding fails.
    pub fn to_item(&self) -> Result<Item, RecordError> {
        Item::from_record(self.item_key(), self)
    }

    /// Decodes a store item into a metadata record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when decoding fails or the key does not match.
    pub fn from_item(item: &Item) -> Result<Self, RecordError> {
        let record: Self = item.to_record()?;
        verify_key(&item.key, record.item_key())?;
        Ok(record)
    }
}

// ============================================================================
// SECTION: Milestone Cells
// ============================================================================

/// Milestone cell record (`PROJECT#{id}` / `MS#ALS..#GATE#..#PHASE#..`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneCell {
    /// Project identifier.
    pub project_id: ProjectId,
    /// Project name at write time.
    pub project_name: ProjectName,
    /// Lifecycle stage.
    pub stage: Stage,
    /// Stage description.
    pub stage_description: String,
    /// Quality gate.
    pub gate: Gate,
    /// Engineering phase.
    pub phase: Phase,
    /// Target date.
    pub date: MilestoneDate,
    /// Last write time.
    pub updated_at: Timestamp,
}

impl MilestoneCell {
    /// Builds a cell record from grid coordinates and content.
    #[must_use]
    pub fn new(
        project_id: &ProjectId,
        project_name: &ProjectName,
        key: CellKey,
        entry: &CellEntry,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            project_id: project_id.clone(),
            project_name: project_name.clone(),
            stage: key.stage,
            stage_description: entry.stage_description.clone(),
            gate: key.gate,
            phase: key.phase,
            date: entry.date,
            updated_at,
        }
    }

    /// Grid coordinates of the cell.
    #[must_use]
    pub const fn cell_key(&self) -> CellKey {
        CellKey::new(self.stage, self.gate, self.phase)
    }

    /// Grid content of the cell.
    #[must_use]
    pub fn entry(&self) -> CellEntry {
        CellEntry {
            date: self.date,
            stage_description: self.stage_description.clone(),
        }
    }

    /// Key of a milestone cell item.
    #[must_use]
    pub fn key_for(project_id: &ProjectId, cell: &CellKey) -> ItemKey {
        ItemKey::new(keys::project_partition(project_id), keys::milestone_sort(cell))
    }

    /// Key of this cell item.
    #[must_use]
    pub fn item_key(&self) -> ItemKey {
        Self::key_for(&self.project_id, &self.cell_key())
    }

    /// Key of the date index entry mirroring this cell.
    #[must_use]
    pub fn mirror_key(&self) -> ItemKey {
        DateIndexEntry::key_for(&self.date, &self.project_id, &self.cell_key())
    }

    /// Builds the date index entry mirroring this cell.
    #[must_use]
    pub fn mirror(&self) -> DateIndexEntry {
        DateIndexEntry {
            project_id: self.project_id.clone(),
            project_name: self.project_name.clone(),
            stage: self.stage,
            stage_description: self.stage_description.clone(),
            gate: self.gate,
            phase: self.phase,
            date: self.date,
            updated_at: self.updated_at,
        }
    }

    /// Encodes the record as a store item.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when encoding fails.
    pub fn to_item(&self) -> Result<Item, RecordError> {
        Item::from_record(self.item_key(), self)
    }

    /// Decodes a store item into a cell record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when decoding fails or the key does not match.
    pub fn from_item(item: &Item) -> Result<Self, RecordError> {
        let record: Self = item.to_record()?;
        verify_key(&item.key, record.item_key())?;
        Ok(record)
    }
}

/// Rebuilds a normalized grid from stored cells.
#[must_use]
pub fn grid_from_cells(cells: &[MilestoneCell]) -> Grid {
    cells.iter().map(|cell| (cell.cell_key(), cell.entry())).collect()
}

// ============================================================================
// SECTION: Date Index
// ============================================================================

/// Date index entry (`DATE#{date}` / `PROJECT#{id}#ALS..#GATE#..#PHASE#..`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateIndexEntry {
    /// Project identifier.
    pub project_id: ProjectId,
    /// Project name at write time.
    pub project_name: ProjectName,
    /// Lifecycle stage.
    pub stage: Stage,
    /// Stage description.
    pub stage_description: String,
    /// Quality gate.
    pub gate: Gate,
    /// Engineering phase.
    pub phase: Phase,
    /// Due date (also the partition).
    pub date: MilestoneDate,
    /// Last write time.
    pub updated_at: Timestamp,
}

impl DateIndexEntry {
    /// Key of a date index item.
    #[must_use]
    pub fn key_for(date: &MilestoneDate, project_id: &ProjectId, cell: &CellKey) -> ItemKey {
        ItemKey::new(keys::date_partition(date), keys::date_sort(project_id, cell))
    }

    /// Key of this entry.
    #[must_use]
    pub fn item_key(&self) -> ItemKey {
        Self::key_for(&self.date, &self.project_id, &CellKey::new(self.stage, self.gate, self.phase))
    }

    /// Encodes the record as a store item.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when encoding fails.
    pub fn to_item(&self) -> Result<Item, RecordError> {
        Item::from_record(self.item_key(), self)
    }

    /// Decodes a store item into a date index entry.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] when decoding fails or the key does not match.
    pub fn from_item(item: &Item) -> Result<Self, RecordError> {
        let record: Self = item.to_record()?;
        verify_key(&item.key, record.item_key())?;
        Ok(record)
    }
}
