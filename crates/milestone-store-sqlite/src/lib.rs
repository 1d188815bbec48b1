// crates/milestone-store-sqlite/src/lib.rs
// ============================================================================
// Module: Milestone SQLite Store
// Description: SQLite-backed key-value store for milestone grids.
// Purpose: Provide a durable KeyValueStore implementation.
// Dependencies: milestone-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Persists `(pk, sk)` items in one `SQLite` table so the project lifecycle
//! and due-date services run against durable storage without a hosted
//! key-value service.

pub mod store;

pub use store::SqliteKeyValueStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
