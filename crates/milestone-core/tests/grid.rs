// crates/milestone-core/tests/grid.rs
// ============================================================================
// Module: Grid and Key Scheme Tests
// Description: Validate grid documents, dates, identifiers, and item keys.
// Purpose: Ensure caller input fails closed and keys stay byte-stable.
// Dependencies: milestone-core
// ============================================================================

//! Grid validation, date parsing, and key derivation tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use milestone_core::CellKey;
use milestone_core::Gate;
use milestone_core::Grid;
use milestone_core::GridError;
use milestone_core::MilestoneDate;
use milestone_core::Phase;
use milestone_core::ProjectId;
use milestone_core::ProjectName;
use milestone_core::RequestId;
use milestone_core::Stage;
use milestone_core::core::keys;

use crate::common::blank_document;
use crate::common::sample_document;
use crate::common::set_cell;
use crate::common::set_description;

// ============================================================================
// SECTION: Key Scheme
// ============================================================================

#[test]
fn key_builders_match_documented_layout() {
    let id = ProjectId::parse("veh-42").unwrap();
    let cell = CellKey::new(Stage::new(3).unwrap(), Gate::Elet, Phase::Tppa);
    let date = MilestoneDate::parse("2026-02-24").unwrap();

    assert_eq!(keys::project_partition(&id), "PROJECT#veh-42");
    assert_eq!(keys::meta_sort(), "META");
    assert_eq!(keys::milestone_sort(&cell), "MS#ALS3#GATE#ELET#PHASE#TPPA");
    assert_eq!(keys::date_partition(&date), "DATE#2026-02-24");
    assert_eq!(keys::date_sort(&id, &cell), "PROJECT#veh-42#ALS3#GATE#ELET#PHASE#TPPA");
}

#[test]
fn every_cell_has_a_distinct_sort_key() {
    let sort_keys: std::collections::BTreeSet<String> =
        CellKey::all().map(|cell| keys::milestone_sort(&cell)).collect();
    assert_eq!(sort_keys.len(), 120);
}

// ============================================================================
// SECTION: Dates and Identifiers
// ============================================================================

#[test]
fn dates_are_strict_calendar_days() {
    assert!(MilestoneDate::parse("2026-02-28").is_ok());
    assert!(MilestoneDate::parse("2028-02-29").is_ok());
    assert!(MilestoneDate::parse("2026-02-29").is_err());
    assert!(MilestoneDate::parse("2026-13-40").is_err());
    assert!(MilestoneDate::parse("2026-1-01").is_err());
    assert!(MilestoneDate::parse("20260101").is_err());
    assert!(MilestoneDate::parse("2026-01-01T00:00").is_err());
    assert_eq!(MilestoneDate::parse("2026-12-31").unwrap().next_day().unwrap().to_string(), "2027-01-01");
}

#[test]
fn dates_keep_zero_padding_and_reject_signed_years() {
    assert_eq!(MilestoneDate::parse("0999-03-07").unwrap().to_string(), "0999-03-07");
    assert!(MilestoneDate::parse("+2026-01-01").is_err());
    assert!(MilestoneDate::parse("2026-01-1 ").is_err());
    assert!(MilestoneDate::parse(" 2026-01-01").is_err());
}

#[test]
fn identifiers_reject_unsafe_values() {
    assert!(ProjectId::parse("").is_err());
    assert!(ProjectId::parse("a#b").is_err());
    assert!(ProjectId::parse(" p1").is_err());
    assert!(ProjectId::parse("p1\t").is_err());
    assert_eq!(ProjectId::parse("p 1").unwrap().as_str(), "p 1");
    assert!(ProjectId::parse("x".repeat(129)).is_err());
    assert!(ProjectName::parse("   ").is_err());
    assert!(RequestId::parse("not-a-uuid").is_err());
    assert!(RequestId::require(None).is_err());
    let canonical = RequestId::parse("3F2C5A9E1D4B4C8A9E217B6D0F1A2C3D").unwrap();
    assert_eq!(canonical.as_str(), "3f2c5a9e-1d4b-4c8a-9e21-7b6d0f1a2c3d");
}

// ============================================================================
// SECTION: Grid Documents
// ============================================================================

#[test]
fn blank_document_normalizes_to_empty_grid() {
    let grid = Grid::from_document(&blank_document()).unwrap();
    assert!(grid.is_empty());
}

#[test]
fn populated_cells_carry_trimmed_stage_description() {
    let mut document = sample_document();
    set_description(&mut document, 1, "  Concept  ");
    let grid = Grid::from_document(&document).unwrap();
    assert_eq!(grid.len(), 3);
    let entry = grid.get(&CellKey::new(Stage::new(1).unwrap(), Gate::Zp5, Phase::Vff)).unwrap();
    assert_eq!(entry.stage_description, "Concept");
    assert_eq!(entry.date.to_string(), "2026-01-01");
}

#[test]
fn document_round_trips_through_grid() {
    let document = sample_document();
    let grid = Grid::from_document(&document).unwrap();
    let rendered = grid.to_document();
    assert_eq!(Grid::from_document(&rendered).unwrap(), grid);
    assert_eq!(rendered.stages.len(), 8);
}

#[test]
fn missing_stage_is_rejected() {
    let mut document = blank_document();
    document.stages.retain(|row| row.stage != 5);
    assert_eq!(Grid::from_document(&document), Err(GridError::MissingStage(5)));
}

#[test]
fn duplicate_and_out_of_range_stages_are_rejected() {
    let mut document = blank_document();
    let copy = document.stages[0].clone();
    document.stages.push(copy);
    assert_eq!(Grid::from_document(&document), Err(GridError::DuplicateStage(1)));

    let mut document = blank_document();
    document.stages[7].stage = 9;
    assert_eq!(Grid::from_document(&document), Err(GridError::StageOutOfRange(9)));
}

#[test]
fn missing_gate_or_phase_is_rejected() {
    let mut document = blank_document();
    document.stages[1].gates.remove(&Gate::Zp7);
    assert_eq!(
        Grid::from_document(&document),
        Err(GridError::MissingGate {
            stage: 2,
            gate: Gate::Zp7
        })
    );

    let mut document = blank_document();
    document.stages[0].gates.get_mut(&Gate::Elet).unwrap().remove(&Phase::So);
    assert_eq!(
        Grid::from_document(&document),
        Err(GridError::MissingPhase {
            stage: 1,
            gate: Gate::Elet,
            phase: Phase::So
        })
    );
}

#[test]
fn invalid_cell_date_is_rejected_with_location() {
    let mut document = blank_document();
    set_cell(&mut document, 4, Gate::Zp5, Phase::Pvs, "2026-13-40");
    let err = Grid::from_document(&document).unwrap_err();
    assert!(matches!(
        err,
        GridError::InvalidDate {
            stage: 4,
            gate: Gate::Zp5,
            phase: Phase::Pvs,
            ..
        }
    ));
}

#[test]
fn document_json_uses_wire_labels() {
    let json = serde_json::to_value(sample_document()).unwrap();
    assert_eq!(json["stages"][0]["gates"]["ZP5"]["VFF"], "2026-01-01");
    assert_eq!(json["stages"][0]["gates"]["ELET"]["PVS"], "2026-02-24");
    assert_eq!(json["stages"][0]["description"], "Concept");
}
