// crates/milestone-core/tests/due_dates.rs
// ============================================================================
// Module: Due-Date Query Tests
// Description: Single-day pagination and multi-day range reads.
// Purpose: Ensure cursor semantics and validation-before-read hold.
// Dependencies: milestone-core
// ============================================================================

//! Due-date query service tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use milestone_core::DueDateConfig;
use milestone_core::DueDateService;
use milestone_core::Gate;
use milestone_core::InMemoryKeyValueStore;
use milestone_core::OperationContext;
use milestone_core::Phase;
use milestone_core::ProjectError;
use milestone_core::runtime::CreateProjectRequest;

use crate::common::REQUEST_A;
use crate::common::REQUEST_B;
use crate::common::blank_document;
use crate::common::fixture;
use crate::common::set_cell;

/// Store with three entries due on 2026-02-24 and one on 2026-02-26.
fn seeded_store() -> InMemoryKeyValueStore {
    let fixture = fixture();
    let ctx = OperationContext::default();

    let mut first = blank_document();
    set_cell(&mut first, 1, Gate::Zp5, Phase::Vff, "2026-02-24");
    set_cell(&mut first, 2, Gate::Elet, Phase::So, "2026-02-24");
    set_cell(&mut first, 4, Gate::Zp7, Phase::Sop, "2026-02-26");
    let mut second = blank_document();
    set_cell(&mut second, 6, Gate::Zp7, Phase::Tppa, "2026-02-24");

    for (id, grid, request_id) in [("alpha", first, REQUEST_A), ("beta", second, REQUEST_B)] {
        fixture
            .service
            .create_project(&ctx, &CreateProjectRequest {
                project_id: id.to_string(),
                project_name: id.to_uppercase(),
                grid,
                request_id: Some(request_id.to_string()),
            })
            .unwrap();
    }
    fixture.store
}

#[test]
fn pages_through_a_day_with_tokens() {
    let store = seeded_store();
    let service = DueDateService::new(store, DueDateConfig::default());

    let first = service.get_due_date("2026-02-24", None, Some(2)).unwrap();
    assert_eq!(first.items.len(), 2);
    let token = first.next_page_token.clone().unwrap();
    assert_eq!(token, "PROJECT#alpha#ALS2#GATE#ELET#PHASE#SO");

    let second = service.get_due_date("2026-02-24", Some(&token), Some(2)).unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].project_id.as_str(), "beta");
    assert!(second.next_page_token.is_none());
}

#[test]
fn full_last_page_is_followed_by_empty_page() {
    let store = seeded_store();
    let service = DueDateService::new(store, DueDateConfig::default());

    let first = service.get_due_date("2026-02-24", None, Some(3)).unwrap();
    assert_eq!(first.items.len(), 3);
    let token = first.next_page_token.unwrap();

    let second = service.get_due_date("2026-02-24", Some(&token), Some(3)).unwrap();
    assert!(second.items.is_empty());
    assert!(second.next_page_token.is_none());
}

#[test]
fn malformed_date_is_rejected_before_store_access() {
    let store = seeded_store();
    store.reset_stats().unwrap();
    let service = DueDateService::new(store.clone(), DueDateConfig::default());

    let err = service.get_due_date("2026-13-40", None, None).unwrap_err();
    assert!(matches!(err, ProjectError::Validation(_)));
    let err = service.get_due_date_range("24.02.2026", None, None).unwrap_err();
    assert!(matches!(err, ProjectError::Validation(_)));
    let err = service.get_due_date("2026-02-24", Some("META"), None).unwrap_err();
    assert!(matches!(err, ProjectError::Validation(_)));

    assert_eq!(store.stats().unwrap().reads(), 0);
}

#[test]
fn limits_are_clamped() {
    let config = DueDateConfig::default();
    assert_eq!(config.page_limit(None), 50);
    assert_eq!(config.page_limit(Some(0)), 1);
    assert_eq!(config.page_limit(Some(500)), 100);
    assert_eq!(config.range_days(None), 21);
    assert_eq!(config.range_days(Some(0)), 1);
    assert_eq!(config.range_days(Some(90)), 60);
}

#[test]
fn oversized_config_still_clamps_to_sixty_days() {
    let config = DueDateConfig {
        default_days: 100,
        max_days: 366,
        ..DueDateConfig::default()
    };
    assert_eq!(config.range_days(None), 60);
    assert_eq!(config.range_days(Some(300)), 60);

    let service = DueDateService::new(InMemoryKeyValueStore::new(), config);
    let range = service.get_due_date_range("2026-01-01", None, None).unwrap();
    assert_eq!(range.pages.len(), 60);
}

#[test]
fn range_reads_one_page_per_day_with_tokens() {
    let store = seeded_store();
    store.reset_stats().unwrap();
    let service = DueDateService::new(store.clone(), DueDateConfig::default());

    let range = service.get_due_date_range("2026-02-23", Some(5), Some(2)).unwrap();

    assert_eq!(range.days, 5);
    let dates: Vec<String> = range.pages.iter().map(|page| page.date.to_string()).collect();
    assert_eq!(dates, vec!["2026-02-23", "2026-02-24", "2026-02-25", "2026-02-26", "2026-02-27"]);
    assert!(range.pages[0].items.is_empty());
    assert_eq!(range.pages[1].items.len(), 2);
    assert!(range.pages[1].next_page_token.is_some());
    assert_eq!(range.pages[3].items.len(), 1);
    assert!(range.pages[3].next_page_token.is_none());
    assert_eq!(store.stats().unwrap().queries, 5);
}

#[test]
fn range_crosses_month_and_year_boundaries() {
    let service = DueDateService::new(InMemoryKeyValueStore::new(), DueDateConfig::default());
    let range = service.get_due_date_range("2026-12-30", Some(3), None).unwrap();
    let dates: Vec<String> = range.pages.iter().map(|page| page.date.to_string()).collect();
    assert_eq!(dates, vec!["2026-12-30", "2026-12-31", "2027-01-01"]);

    let clamped = service.get_due_date_range("2026-01-01", Some(365), None).unwrap();
    assert_eq!(clamped.pages.len(), 60);
}

#[test]
fn page_serializes_with_camel_case_token() {
    let service = DueDateService::new(seeded_store(), DueDateConfig::default());
    let page = service.get_due_date("2026-02-26", None, None).unwrap();
    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["date"], "2026-02-26");
    assert_eq!(json["items"][0]["projectId"], "alpha");
    assert_eq!(json["items"][0]["gate"], "ZP7");
    assert!(json["nextPageToken"].is_null());
}
