// crates/milestone-core/src/core/grid.rs
// ============================================================================
// Module: Milestone Grid
// Description: Stage x gate x phase grid of optional milestone dates.
// Purpose: Validate caller grid documents and normalize them for diffing.
// Dependencies: crate::core::date, serde, thiserror
// ============================================================================

//! ## Overview
//! Callers submit a [`GridDocument`]: every stage, gate, and phase must be
//! present, and each cell holds either a date or a blank string. Internally a
//! [`Grid`] keeps only populated cells, so "blank" and "absent" collapse to the
//! same representation and the diff engine never has to distinguish them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::date::DateError;
use crate::core::date::MilestoneDate;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lowest lifecycle stage number.
pub const MIN_STAGE: u8 = 1;
/// Highest lifecycle stage number.
pub const MAX_STAGE: u8 = 8;
/// Maximum number of cells in a grid.
pub const MAX_GRID_CELLS: usize = (MAX_STAGE as usize) * Gate::ALL.len() * Phase::ALL.len();
/// Maximum stage description length in characters.
pub const MAX_STAGE_DESCRIPTION_LENGTH: usize = 256;

// ============================================================================
// SECTION: Axes
// ============================================================================

/// Vehicle lifecycle stage (ALS), 1 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stage(u8);

impl Stage {
    /// Creates a stage from its number.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::StageOutOfRange`] outside `1..=8`.
    pub fn new(value: u8) -> Result<Self, GridError> {
        if value < MIN_STAGE || value > MAX_STAGE {
            return Err(GridError::StageOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the stage number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Iterates all stages in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (MIN_STAGE ..= MAX_STAGE).map(Self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<u8> for Stage {
    type Error = GridError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Stage> for u8 {
    fn from(value: Stage) -> Self {
        value.0
    }
}

/// Quality gate checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gate {
    /// ZP5 gate.
    #[serde(rename = "ZP5")]
    Zp5,
    /// ELET gate.
    #[serde(rename = "ELET")]
    Elet,
    /// ZP7 gate.
    #[serde(rename = "ZP7")]
    Zp7,
}

impl Gate {
    /// All gates in canonical order.
    pub const ALL: [Self; 3] = [Self::Zp5, Self::Elet, Self::Zp7];

    /// Returns the key label for the gate.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zp5 => "ZP5",
            Self::Elet => "ELET",
            Self::Zp7 => "ZP7",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engineering phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// VFF phase.
    #[serde(rename = "VFF")]
    Vff,
    /// PVS phase.
    #[serde(rename = "PVS")]
    Pvs,
    /// SO phase.
    #[serde(rename = "SO")]
    So,
    /// TPPA phase.
    #[serde(rename = "TPPA")]
    Tppa,
    /// SOP phase.
    #[serde(rename = "SOP")]
    Sop,
}

impl Phase {
    /// All phases in canonical order.
    pub const ALL: [Self; 5] = [Self::Vff, Self::Pvs, Self::So, Self::Tppa, Self::Sop];

    /// Returns the key label for the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vff => "VFF",
            Self::Pvs => "PVS",
            Self::So => "SO",
            Self::Tppa => "TPPA",
            Self::Sop => "SOP",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Grid shape and content validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Stage number outside `1..=8`.
    #[error("stage {0} is out of range {MIN_STAGE}..={MAX_STAGE}")]
    StageOutOfRange(u8),
    /// Stage listed more than once.
    #[error("stage {0} appears more than once")]
    DuplicateStage(u8),
    /// Required stage missing.
    #[error("stage {0} is missing")]
    MissingStage(u8),
    /// Required gate missing from a stage.
    #[error("stage {stage} is missing gate {gate}")]
    MissingGate {
        /// Stage number.
        stage: u8,
        /// Missing gate.
        gate: Gate,
    },
    /// Required phase missing from a gate.
    #[error("stage {stage} gate {gate} is missing phase {phase}")]
    MissingPhase {
        /// Stage number.
        stage: u8,
        /// Gate label.
        gate: Gate,
        /// Missing phase.
        phase: Phase,
    },
    /// Cell date is not a valid calendar date.
    #[error("stage {stage} gate {gate} phase {phase}: {source}")]
    InvalidDate {
        /// Stage number.
        stage: u8,
        /// Gate label.
        gate: Gate,
        /// Phase label.
        phase: Phase,
        /// Underlying date error.
        source: DateError,
    },
    /// Stage description exceeds the length limit.
    #[error("stage {0} description exceeds {MAX_STAGE_DESCRIPTION_LENGTH} characters")]
    DescriptionTooLong(u8),
}

// ============================================================================
// SECTION: Normalized Grid
// ============================================================================

/// Coordinates of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    /// Lifecycle stage.
    pub stage: Stage,
    /// Quality gate.
    pub gate: Gate,
    /// Engineering phase.
    pub phase: Phase,
}

impl CellKey {
    /// Creates a cell key.
    #[must_use]
    pub const fn new(stage: Stage, gate: Gate, phase: Phase) -> Self {
        Self {
            stage,
            gate,
            phase,
        }
    }

    /// Iterates every cell key in canonical order.
    pub fn all() -> impl Iterator<Item = Self> {
        Stage::all().flat_map(|stage| {
            Gate::ALL.into_iter().flat_map(move |gate| {
                Phase::ALL.into_iter().map(move |phase| Self::new(stage, gate, phase))
            })
        })
    }
}

/// Content of a populated cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntry {
    /// Target date.
    pub date: MilestoneDate,
    /// Description of the owning stage.
    pub stage_description: String,
}

/// Normalized grid holding only populated cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    /// Populated cells keyed by coordinates.
    cells: BTreeMap<CellKey, CellEntry>,
}

impl Grid {
    /// Creates an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a cell, replacing any previous entry.
    pub fn insert(&mut self, key: CellKey, entry: CellEntry) {
        self.cells.insert(key, entry);
    }

    /// Clears a cell.
    pub fn remove(&mut self, key: &CellKey) -> Option<CellEntry> {
        self.cells.remove(key)
    }

    /// Returns the entry for a cell, if populated.
    #[must_use]
    pub fn get(&self, key: &CellKey) -> Option<&CellEntry> {
        self.cells.get(key)
    }

    /// Iterates populated cells in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &CellEntry)> {
        self.cells.iter()
    }

    /// Returns the number of populated cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true when no cell is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Validates a caller document and normalizes it into a grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] when a stage, gate, or phase is missing or
    /// duplicated, or when a cell holds an invalid date.
    pub fn from_document(document: &GridDocument) -> Result<Self, GridError> {
        let mut seen = BTreeSet::new();
        let mut grid = Self::new();
        for stage_doc in &document.stages {
            let stage = Stage::new(stage_doc.stage)?;
            if !seen.insert(stage) {
                return Err(GridError::DuplicateStage(stage.get()));
            }
            if stage_doc.description.chars().count() > MAX_STAGE_DESCRIPTION_LENGTH {
                return Err(GridError::DescriptionTooLong(stage.get()));
            }
            let description = stage_doc.description.trim().to_string();
            for gate in Gate::ALL {
                let phases = stage_doc.gates.get(&gate).ok_or(GridError::MissingGate {
                    stage: stage.get(),
                    gate,
                })?;
                for phase in Phase::ALL {
                    let raw = phases.get(&phase).ok_or(GridError::MissingPhase {
                        stage: stage.get(),
                        gate,
                        phase,
                    })?;
                    let date = MilestoneDate::parse_optional(raw).map_err(|source| {
                        GridError::InvalidDate {
                            stage: stage.get(),
                            gate,
                            phase,
                            source,
                        }
                    })?;
                    if let Some(date) = date {
                        grid.insert(
                            CellKey::new(stage, gate, phase),
                            CellEntry {
                                date,
                                stage_description: description.clone(),
                            },
                        );
                    }
                }
            }
        }
        if let Some(missing) = Stage::all().find(|stage| !seen.contains(stage)) {
            return Err(GridError::MissingStage(missing.get()));
        }
        Ok(grid)
    }

    /// Renders the grid as a complete document with blank unset cells.
    #[must_use]
    pub fn to_document(&self) -> GridDocument {
        let stages = Stage::all()
            .map(|stage| {
                let description = self
                    .cells
                    .iter()
                    .find(|(key, _)| key.stage == stage)
                    .map(|(_, entry)| entry.stage_description.clone())
                    .unwrap_or_default();
                let gates = Gate::ALL
                    .into_iter()
                    .map(|gate| {
                        let phases = Phase::ALL
                            .into_iter()
                            .map(|phase| {
                                let value = self
                                    .get(&CellKey::new(stage, gate, phase))
                                    .map(|entry| entry.date.to_string())
                                    .unwrap_or_default();
                                (phase, value)
                            })
                            .collect();
                        (gate, phases)
                    })
                    .collect();
                StageDocument {
                    stage: stage.get(),
                    description,
                    gates,
                }
            })
            .collect();
        GridDocument {
            stages,
        }
    }
}

impl FromIterator<(CellKey, CellEntry)> for Grid {
    fn from_iter<T: IntoIterator<Item = (CellKey, CellEntry)>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// SECTION: Wire Document
// ============================================================================

/// Caller-facing grid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDocument {
    /// One entry per lifecycle stage.
    pub stages: Vec<StageDocument>,
}

/// Stage row of a grid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDocument {
    /// Stage number.
    pub stage: u8,
    /// Stage description copied onto every populated cell.
    #[serde(default)]
    pub description: String,
    /// Gate to phase to date text; blank text means unset.
    pub gates: BTreeMap<Gate, BTreeMap<Phase, String>>,
}
