// crates/milestone-core/tests/proptest_diff.rs
// ============================================================================
// Module: Grid Diff Property-Based Tests
// Description: Property tests for diff idempotence and store round-trips.
// Purpose: Ensure any grid transition leaves cells and mirrors in agreement.
// ============================================================================

//! Property-based tests for diff invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::collections::BTreeSet;

use milestone_core::CellKey;
use milestone_core::DateIndexEntry;
use milestone_core::Grid;
use milestone_core::GridDocument;
use milestone_core::ItemKey;
use milestone_core::MilestoneCell;
use milestone_core::OperationContext;
use milestone_core::ProjectId;
use milestone_core::ProjectName;
use milestone_core::Timestamp;
use milestone_core::core::keys;
use milestone_core::runtime::CreateProjectRequest;
use milestone_core::runtime::DiffTarget;
use milestone_core::runtime::UpdateProjectRequest;
use milestone_core::runtime::diff_grid;
use proptest::prelude::*;

use crate::common::REQUEST_A;
use crate::common::REQUEST_B;
use crate::common::blank_document;
use crate::common::fixture;
use crate::common::set_cell;
use crate::common::set_description;

const DESCRIPTIONS: [&str; 3] = ["", "Concept", "Launch"];

fn document_strategy() -> impl Strategy<Value = GridDocument> {
    (
        prop::collection::vec(prop::option::weighted(0.3, (1_u8 ..= 12, 1_u8 ..= 28)), 120),
        prop::collection::vec(0_usize .. DESCRIPTIONS.len(), 8),
    )
        .prop_map(|(cells, descriptions)| {
            let mut document = blank_document();
            for (stage, description) in (1_u8 ..= 8).zip(descriptions) {
                set_description(&mut document, stage, DESCRIPTIONS[description]);
            }
            for (cell, value) in CellKey::all().zip(cells) {
                if let Some((month, day)) = value {
                    set_cell(
                        &mut document,
                        cell.stage.get(),
                        cell.gate,
                        cell.phase,
                        &format!("2026-{month:02}-{day:02}"),
                    );
                }
            }
            document
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn diff_against_self_is_empty(document in document_strategy()) {
        let id = ProjectId::parse("prop").unwrap();
        let name = ProjectName::parse("Prop").unwrap();
        let grid = Grid::from_document(&document).unwrap();
        let cells: Vec<MilestoneCell> = grid
            .iter()
            .map(|(key, entry)| MilestoneCell::new(&id, &name, *key, entry, Timestamp::from_unix_millis(0)))
            .collect();
        let diff = diff_grid(&cells, &grid, DiffTarget {
            project_id: &id,
            project_name: &name,
            updated_at: Timestamp::from_unix_millis(1),
        });
        prop_assert!(diff.is_empty());
    }

    #[test]
    fn applying_diff_round_trips_through_store(
        first in document_strategy(),
        second in document_strategy(),
    ) {
        let fixture = fixture();
        let ctx = OperationContext::default();
        fixture.service.create_project(&ctx, &CreateProjectRequest {
            project_id: "prop".to_string(),
            project_name: "Prop".to_string(),
            grid: first,
            request_id: Some(REQUEST_A.to_string()),
        }).unwrap();
        let view = fixture.service.update_project(&ctx, &UpdateProjectRequest {
            project_id: "prop".to_string(),
            grid: second.clone(),
            request_id: Some(REQUEST_B.to_string()),
        }).unwrap();

        let expected = Grid::from_document(&second).unwrap();
        prop_assert_eq!(Grid::from_document(&view.grid).unwrap(), expected.clone());

        let items = fixture.store.snapshot().unwrap();
        let cell_mirrors: BTreeSet<ItemKey> = items
            .iter()
            .filter(|item| item.key.sk.starts_with(keys::MILESTONE_SORT_PREFIX))
            .map(|item| MilestoneCell::from_item(item).unwrap().mirror_key())
            .collect();
        let index_keys: BTreeSet<ItemKey> = items
            .iter()
            .filter(|item| item.key.pk.starts_with(keys::DATE_PREFIX))
            .map(|item| DateIndexEntry::from_item(item).unwrap().item_key())
            .collect();
        prop_assert_eq!(cell_mirrors.len(), expected.len());
        prop_assert_eq!(cell_mirrors, index_keys);
    }
}
