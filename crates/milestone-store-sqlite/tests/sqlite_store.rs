// crates/milestone-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Key-Value Store Tests
// Description: Contract and durability tests for the SQLite store.
// Purpose: Validate path safety, schema versioning, conditional writes,
//          paging, and end-to-end lifecycle behavior on durable storage.
// ============================================================================

//! ## Overview
//! Integration tests for the `SQLite` key-value store:
//! - Path safety checks and schema version validation
//! - Conditional put/update semantics shared with the in-memory store
//! - Partition queries, sort key scans, and batch limits
//! - Project lifecycle and due-date reads across a reopen

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use milestone_core::BatchWriter;
use milestone_core::BatchWriterConfig;
use milestone_core::Condition;
use milestone_core::ConditionalWrite;
use milestone_core::DueDateConfig;
use milestone_core::DueDateService;
use milestone_core::GridDocument;
use milestone_core::Item;
use milestone_core::ItemKey;
use milestone_core::KeyValueStore;
use milestone_core::OperationContext;
use milestone_core::ProjectService;
use milestone_core::ProjectStatus;
use milestone_core::QueryRequest;
use milestone_core::ReadConsistency;
use milestone_core::SortKeyCondition;
use milestone_core::StoreError;
use milestone_core::WriteRequest;
use milestone_core::core::Attributes;
use milestone_core::runtime::CreateProjectRequest;
use milestone_core::runtime::NoopAuditSink;
use milestone_core::runtime::ThreadSleeper;
use milestone_core::runtime::UpdateProjectRequest;
use milestone_store_sqlite::SqliteKeyValueStore;
use milestone_store_sqlite::SqliteStoreConfig;
use milestone_store_sqlite::SqliteStoreError;
use milestone_store_sqlite::SqliteStoreMode;
use milestone_store_sqlite::SqliteSyncMode;
use rusqlite::Connection;
use rusqlite::params;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn open(dir: &TempDir) -> SqliteKeyValueStore {
    SqliteKeyValueStore::new(SqliteStoreConfig::new(dir.path().join("milestones.db"))).unwrap()
}

fn item(pk: &str, sk: &str, status: &str) -> Item {
    let mut attributes = Attributes::new();
    attributes.insert("status".to_string(), json!(status));
    Item::new(ItemKey::new(pk, sk), attributes)
}

fn service(store: SqliteKeyValueStore) -> ProjectService<SqliteKeyValueStore> {
    let writer = BatchWriter::new(
        BatchWriterConfig::default(),
        Arc::new(ThreadSleeper),
        Arc::new(NoopAuditSink),
    );
    ProjectService::new(store, writer)
}

fn document(cells: &[(u8, &str, &str, &str)]) -> GridDocument {
    let mut stages = Vec::new();
    for stage in 1_u8 ..= 8 {
        let mut gates = serde_json::Map::new();
        for gate in ["ZP5", "ELET", "ZP7"] {
            let mut phases = serde_json::Map::new();
            for phase in ["VFF", "PVS", "SO", "TPPA", "SOP"] {
                let value = cells
                    .iter()
                    .find(|(s, g, p, _)| *s == stage && *g == gate && *p == phase)
                    .map_or("", |(_, _, _, date)| *date);
                phases.insert(phase.to_string(), json!(value));
            }
            gates.insert(gate.to_string(), serde_json::Value::Object(phases));
        }
        stages.push(json!({ "stage": stage, "description": "", "gates": gates }));
    }
    serde_json::from_value(json!({ "stages": stages })).unwrap()
}

// ============================================================================
// SECTION: Open and Schema
// ============================================================================

#[test]
fn rejects_directory_and_overlong_paths() {
    let dir = TempDir::new().unwrap();
    let err = SqliteKeyValueStore::new(SqliteStoreConfig::new(dir.path())).err().unwrap();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));

    let long = dir.path().join("a".repeat(300)).join("store.db");
    let err = SqliteKeyValueStore::new(SqliteStoreConfig::new(long)).err().unwrap();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));

    let mut config = SqliteStoreConfig::new(dir.path().join("zero.db"));
    config.max_batch_size = 0;
    assert!(matches!(SqliteKeyValueStore::new(config), Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn creates_parent_directories_and_reports_readiness() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(dir.path().join("nested").join("deeper").join("m.db"));
    config.journal_mode = SqliteStoreMode::Delete;
    config.sync_mode = SqliteSyncMode::Normal;
    let store = SqliteKeyValueStore::new(config).unwrap();
    store.check_connection().unwrap();
    assert_eq!(store.item_count().unwrap(), 0);
}

#[test]
fn rejects_unknown_schema_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("milestones.db");
    drop(SqliteKeyValueStore::new(SqliteStoreConfig::new(&path)).unwrap());

    let connection = Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = ?1", params![99]).unwrap();
    drop(connection);

    let err = SqliteKeyValueStore::new(SqliteStoreConfig::new(&path)).err().unwrap();
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
}

#[test]
fn corrupt_attributes_fail_closed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("milestones.db");
    let store = SqliteKeyValueStore::new(SqliteStoreConfig::new(&path)).unwrap();

    let connection = Connection::open(&path).unwrap();
    connection
        .execute(
            "INSERT INTO items (pk, sk, attributes) VALUES (?1, ?2, ?3)",
            params!["P#1", "META", b"not json".to_vec()],
        )
        .unwrap();
    drop(connection);

    let err = store.get_item(&ItemKey::new("P#1", "META"), ReadConsistency::Strong).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

// ============================================================================
// SECTION: Store Contract
// ============================================================================

#[test]
fn conditional_put_and_update_follow_conditions() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let first = item("P#1", "META", "CREATING");

    assert_eq!(store.put_item(&first, &Condition::NotExists).unwrap(), ConditionalWrite::Applied);
    assert_eq!(
        store.put_item(&first, &Condition::NotExists).unwrap(),
        ConditionalWrite::ConditionFailed
    );

    let mut patch = Attributes::new();
    patch.insert("status".to_string(), json!("ACTIVE"));
    patch.insert("lastRequestId".to_string(), json!("r-2"));
    let guarded = Condition::All(vec![
        Condition::equals("status", "CREATING"),
        Condition::AttributeEquals {
            name: "lastRequestId".to_string(),
            value: serde_json::Value::Null,
        },
    ]);
    assert!(!store.update_item(&first.key, &patch, &guarded).unwrap().is_applied());
    assert!(
        store
            .update_item(&first.key, &patch, &Condition::equals("status", "CREATING"))
            .unwrap()
            .is_applied()
    );
    assert!(
        !store
            .update_item(&ItemKey::new("P#2", "META"), &patch, &Condition::Always)
            .unwrap()
            .is_applied()
    );

    let stored = store.get_item(&first.key, ReadConsistency::Eventual).unwrap().unwrap();
    assert_eq!(stored.attribute("status"), Some(&json!("ACTIVE")));
    assert_eq!(stored.attribute("lastRequestId"), Some(&json!("r-2")));
}

#[test]
fn query_pages_within_partition_and_prefix() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let writes: Vec<WriteRequest> = [
        item("A", "META", "x"),
        item("A", "MS#1", "x"),
        item("A", "MS#2", "x"),
        item("A", "MS#3", "x"),
        item("AB", "MS#0", "x"),
    ]
    .into_iter()
    .map(WriteRequest::Put)
    .collect();
    assert!(store.batch_write(&writes).unwrap().is_empty());

    let mut request = QueryRequest {
        partition_key: "A".to_string(),
        sort_key: SortKeyCondition::BeginsWith("MS#".to_string()),
        exclusive_start: None,
        limit: 2,
    };
    let first = store.query(&request).unwrap();
    let sort_keys: Vec<&str> = first.items.iter().map(|item| item.key.sk.as_str()).collect();
    assert_eq!(sort_keys, vec!["MS#1", "MS#2"]);
    assert_eq!(first.last_evaluated_key, Some(ItemKey::new("A", "MS#2")));

    request.exclusive_start = Some("MS#2".to_string());
    let second = store.query(&request).unwrap();
    assert_eq!(second.items.len(), 1);
    assert!(second.last_evaluated_key.is_none());

    request.sort_key = SortKeyCondition::Equals("META".to_string());
    request.exclusive_start = None;
    assert_eq!(store.query(&request).unwrap().items.len(), 1);

    request.sort_key = SortKeyCondition::All;
    request.limit = 10;
    assert_eq!(store.query(&request).unwrap().items.len(), 4);

    request.limit = 0;
    assert!(matches!(store.query(&request), Err(StoreError::Invalid(_))));
}

#[test]
fn scan_orders_by_partition_and_pages() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let writes: Vec<WriteRequest> = ["P#c", "P#a", "P#b"]
        .into_iter()
        .map(|pk| WriteRequest::Put(item(pk, "META", "ACTIVE")))
        .chain([WriteRequest::Put(item("P#a", "MS#1", "x"))])
        .collect();
    store.batch_write(&writes).unwrap();

    let page = store.scan_sort_key("META", None, 2).unwrap();
    let pks: Vec<&str> = page.items.iter().map(|item| item.key.pk.as_str()).collect();
    assert_eq!(pks, vec!["P#a", "P#b"]);
    let rest = store.scan_sort_key("META", page.last_evaluated_key.as_ref(), 2).unwrap();
    assert_eq!(rest.items.len(), 1);
    assert!(rest.last_evaluated_key.is_none());
}

#[test]
fn batch_applies_puts_and_deletes_and_enforces_limit() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(dir.path().join("milestones.db"));
    config.max_batch_size = 3;
    let store = SqliteKeyValueStore::new(config).unwrap();
    assert_eq!(store.max_batch_size(), 3);

    let writes = vec![
        WriteRequest::Put(item("A", "1", "x")),
        WriteRequest::Put(item("A", "2", "x")),
        WriteRequest::Delete(ItemKey::new("A", "missing")),
    ];
    assert!(store.batch_write(&writes).unwrap().is_empty());
    store.batch_write(&[WriteRequest::Delete(ItemKey::new("A", "1"))]).unwrap();
    assert_eq!(store.item_count().unwrap(), 1);

    let oversized: Vec<WriteRequest> =
        (0 .. 4).map(|n| WriteRequest::Delete(ItemKey::new("A", n.to_string()))).collect();
    assert!(matches!(store.batch_write(&oversized), Err(StoreError::Invalid(_))));
}

// ============================================================================
// SECTION: Lifecycle on SQLite
// ============================================================================

#[test]
fn lifecycle_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let ctx = OperationContext::default();
    {
        let service = service(open(&dir));
        service
            .create_project(&ctx, &CreateProjectRequest {
                project_id: "alpha".to_string(),
                project_name: "Alpha".to_string(),
                grid: document(&[(1, "ZP5", "VFF", "2026-01-01"), (2, "ELET", "SO", "2026-02-24")]),
                request_id: Some("8a6e0804-2bd0-4672-b79d-d97027f9071a".to_string()),
            })
            .unwrap();
        service
            .update_project(&ctx, &UpdateProjectRequest {
                project_id: "alpha".to_string(),
                grid: document(&[(1, "ZP5", "VFF", "2026-01-01"), (2, "ELET", "SO", "2026-02-25")]),
                request_id: Some("0f4c8e2a-5b7d-4e91-a3c6-2d8f1b9e7a54".to_string()),
            })
            .unwrap();
    }

    let store = open(&dir);
    assert_eq!(store.item_count().unwrap(), 5);
    let view = service(store.clone()).get_project("alpha").unwrap();
    assert_eq!(view.status, ProjectStatus::Active);

    let due = DueDateService::new(store, DueDateConfig::default());
    assert!(due.get_due_date("2026-02-24", None, None).unwrap().items.is_empty());
    let moved = due.get_due_date("2026-02-25", None, None).unwrap();
    assert_eq!(moved.items.len(), 1);
    assert_eq!(moved.items[0].project_id.as_str(), "alpha");
}
