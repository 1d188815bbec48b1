// crates/milestone-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Key-Value Store
// Description: Durable KeyValueStore backed by SQLite.
// Purpose: Persist milestone items with transactional conditional writes.
// Dependencies: milestone-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`KeyValueStore`] using `SQLite`. Every
//! item lives in one `items` table keyed by `(pk, sk)` with its attributes
//! stored as a JSON blob. Conditional writes read the current row and apply
//! [`Condition::evaluate`] inside an immediate transaction, so the in-memory
//! and durable stores agree on compare-and-swap semantics. Batch writes run
//! in a single transaction; when the database is busy or locked the whole
//! batch is handed back as unprocessed for the batch writer to retry.
//! Database contents are untrusted: attribute blobs that fail to decode are
//! reported as corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use milestone_core::Condition;
use milestone_core::ConditionalWrite;
use milestone_core::Item;
use milestone_core::ItemKey;
use milestone_core::KeyValueStore;
use milestone_core::QueryPage;
use milestone_core::QueryRequest;
use milestone_core::ReadConsistency;
use milestone_core::SortKeyCondition;
use milestone_core::StoreError;
use milestone_core::WriteRequest;
use milestone_core::core::Attributes;
use milestone_core::interfaces::DEFAULT_MAX_BATCH_SIZE;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Current schema version of the items table.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout for `SQLite` connections.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum encoded attribute payload per item.
pub const MAX_ITEM_BYTES: usize = 400 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` key-value store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - `max_batch_size` must be greater than zero.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Largest batch accepted by `batch_write`.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl SqliteStoreConfig {
    /// Creates a configuration with defaults for the given database path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default batch size limit.
const fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw attribute payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored attributes failed to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or request.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Item payload exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "item attributes exceed size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps an engine error into a store error.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed key-value store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Conditions are evaluated inside the same transaction as the write.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteKeyValueStore {
    /// Opens an `SQLite`-backed key-value store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        if config.max_batch_size == 0 {
            return Err(SqliteStoreError::Invalid(
                "max_batch_size must be greater than zero".to_string(),
            ));
        }
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn check_connection(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard.query_row("SELECT 1", [], |_| Ok(())).map_err(|err| db_error(&err))
    }

    /// Returns the number of stored items.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the count query fails.
    pub fn item_count(&self) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row("SELECT COUNT(1) FROM items", [], |row| row.get(0))
            .map_err(|err| db_error(&err))?;
        u64::try_from(count).map_err(|_| SqliteStoreError::Corrupt("negative item count".to_string()))
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    /// Applies a conditional write inside an immediate transaction.
    ///
    /// `build` receives the current item and returns the item to write.
    fn conditional_write(
        &self,
        key: &ItemKey,
        condition: &Condition,
        build: impl FnOnce(Option<Item>) -> Option<Item>,
    ) -> Result<ConditionalWrite, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| db_error(&err))?;
        let existing = fetch_item(&tx, key)?;
        if !condition.evaluate(existing.as_ref()) {
            return Ok(ConditionalWrite::ConditionFailed);
        }
        let Some(next) = build(existing) else {
            return Ok(ConditionalWrite::ConditionFailed);
        };
        upsert_item(&tx, &next)?;
        tx.commit().map_err(|err| db_error(&err))?;
        Ok(ConditionalWrite::Applied)
    }

    /// Applies a batch in one transaction.
    ///
    /// Returns `Ok(false)` when the database was busy or locked and nothing
    /// was committed.
    fn apply_batch(&self, requests: &[WriteRequest]) -> Result<bool, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = match guard.transaction_with_behavior(TransactionBehavior::Immediate) {
            Ok(tx) => tx,
            Err(err) if is_contention(&err) => return Ok(false),
            Err(err) => return Err(db_error(&err)),
        };
        for request in requests {
            let result = match request {
                WriteRequest::Put(item) => upsert_item(&tx, item),
                WriteRequest::Delete(key) => delete_item(&tx, key),
            };
            match result {
                Ok(()) => {}
                Err(SqliteStoreError::Db(message))
                    if classify_db_error_message(&message) != SqliteDbErrorKind::Other =>
                {
                    return Ok(false);
                }
                Err(err) => return Err(err),
            }
        }
        match tx.commit() {
            Ok(()) => Ok(true),
            Err(err) if is_contention(&err) => Ok(false),
            Err(err) => Err(db_error(&err)),
        }
    }

    /// Runs a paged select and decodes the rows.
    fn select_page(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
        limit: usize,
    ) -> Result<QueryPage, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard.prepare(sql).map_err(|err| db_error(&err))?;
        let rows = statement
            .query_map(params, |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
            })
            .map_err(|err| db_error(&err))?;
        let mut items = Vec::new();
        for row in rows {
            let (pk, sk, blob) = row.map_err(|err| db_error(&err))?;
            let key = ItemKey::new(pk, sk);
            let attributes = decode_attributes(&key, &blob)?;
            items.push(Item::new(key, attributes));
        }
        let last_evaluated_key =
            if items.len() == limit { items.last().map(|item| item.key.clone()) } else { None };
        Ok(QueryPage {
            items,
            last_evaluated_key,
        })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get_item(
        &self,
        key: &ItemKey,
        _consistency: ReadConsistency,
    ) -> Result<Option<Item>, StoreError> {
        let guard = self.lock()?;
        Ok(fetch_item(&guard, key)?)
    }

    fn put_item(&self, item: &Item, condition: &Condition) -> Result<ConditionalWrite, StoreError> {
        Ok(self.conditional_write(&item.key, condition, |_| Some(item.clone()))?)
    }

    fn update_item(
        &self,
        key: &ItemKey,
        attributes: &Attributes,
        condition: &Condition,
    ) -> Result<ConditionalWrite, StoreError> {
        Ok(self.conditional_write(key, condition, |existing| {
            existing.map(|mut item| {
                for (name, value) in attributes {
                    item.attributes.insert(name.clone(), value.clone());
                }
                item
            })
        })?)
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryPage, StoreError> {
        let limit = sql_limit(request.limit)?;
        let start = request.exclusive_start.as_deref();
        let page = match &request.sort_key {
            SortKeyCondition::All => self.select_page(
                "SELECT pk, sk, attributes FROM items
                 WHERE pk = ?1 AND (?2 IS NULL OR sk > ?2)
                 ORDER BY sk LIMIT ?3",
                &[&request.partition_key, &start, &limit],
                request.limit,
            )?,
            SortKeyCondition::BeginsWith(prefix) => self.select_page(
                "SELECT pk, sk, attributes FROM items
                 WHERE pk = ?1 AND (?2 IS NULL OR sk > ?2) AND substr(sk, 1, length(?3)) = ?3
                 ORDER BY sk LIMIT ?4",
                &[&request.partition_key, &start, prefix, &limit],
                request.limit,
            )?,
            SortKeyCondition::Equals(sort_key) => self.select_page(
                "SELECT pk, sk, attributes FROM items
                 WHERE pk = ?1 AND (?2 IS NULL OR sk > ?2) AND sk = ?3
                 ORDER BY sk LIMIT ?4",
                &[&request.partition_key, &start, sort_key, &limit],
                request.limit,
            )?,
        };
        Ok(page)
    }

    fn scan_sort_key(
        &self,
        sort_key: &str,
        exclusive_start: Option<&ItemKey>,
        limit: usize,
    ) -> Result<QueryPage, StoreError> {
        let sql_limit = sql_limit(limit)?;
        let start = exclusive_start.map(|key| key.pk.as_str());
        Ok(self.select_page(
            "SELECT pk, sk, attributes FROM items
             WHERE sk = ?1 AND (?2 IS NULL OR pk > ?2)
             ORDER BY pk LIMIT ?3",
            &[&sort_key, &start, &sql_limit],
            limit,
        )?)
    }

    fn batch_write(&self, requests: &[WriteRequest]) -> Result<Vec<WriteRequest>, StoreError> {
        if requests.len() > self.config.max_batch_size {
            return Err(StoreError::Invalid(format!(
                "batch of {} exceeds limit {}",
                requests.len(),
                self.config.max_batch_size
            )));
        }
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        if self.apply_batch(requests)? { Ok(Vec::new()) } else { Ok(requests.to_vec()) }
    }

    fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }
}

// ============================================================================
// SECTION: Row Access
// ============================================================================

/// Reads one item by key.
fn fetch_item(connection: &Connection, key: &ItemKey) -> Result<Option<Item>, SqliteStoreError> {
    let blob: Option<Vec<u8>> = connection
        .query_row(
            "SELECT attributes FROM items WHERE pk = ?1 AND sk = ?2",
            params![key.pk, key.sk],
            |row| row.get(0),
        )
        .optional()
        .map_err(|err| db_error(&err))?;
    blob.map(|blob| decode_attributes(key, &blob).map(|attributes| Item::new(key.clone(), attributes)))
        .transpose()
}

/// Inserts or replaces an item.
fn upsert_item(tx: &Transaction<'_>, item: &Item) -> Result<(), SqliteStoreError> {
    let blob = serde_json::to_vec(&item.attributes)
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if blob.len() > MAX_ITEM_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_ITEM_BYTES,
            actual_bytes: blob.len(),
        });
    }
    tx.execute(
        "INSERT INTO items (pk, sk, attributes) VALUES (?1, ?2, ?3)
         ON CONFLICT (pk, sk) DO UPDATE SET attributes = excluded.attributes",
        params![item.key.pk, item.key.sk, blob],
    )
    .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Deletes an item; deleting a missing item is a no-op.
fn delete_item(tx: &Transaction<'_>, key: &ItemKey) -> Result<(), SqliteStoreError> {
    tx.execute("DELETE FROM items WHERE pk = ?1 AND sk = ?2", params![key.pk, key.sk])
        .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Decodes an attribute blob, failing closed on malformed data.
fn decode_attributes(key: &ItemKey, blob: &[u8]) -> Result<Attributes, SqliteStoreError> {
    serde_json::from_slice(blob)
        .map_err(|err| SqliteStoreError::Corrupt(format!("attributes at {key}: {err}")))
}

/// Converts a page limit into an SQL parameter.
fn sql_limit(limit: usize) -> Result<i64, SqliteStoreError> {
    if limit == 0 {
        return Err(SqliteStoreError::Invalid("limit must be greater than zero".to_string()));
    }
    i64::try_from(limit).map_err(|_| SqliteStoreError::Invalid("limit out of range".to_string()))
}

/// Classification used when attributing `SQLite` DB error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqliteDbErrorKind {
    /// Error text indicates busy timeout contention.
    Busy,
    /// Error text indicates lock contention.
    Locked,
    /// Any error not matching busy/locked classifiers.
    Other,
}

/// Classifies database error text into coarse contention categories.
fn classify_db_error_message(message: &str) -> SqliteDbErrorKind {
    let lower = message.to_ascii_lowercase();
    if lower.contains("busy") {
        SqliteDbErrorKind::Busy
    } else if lower.contains("locked") {
        SqliteDbErrorKind::Locked
    } else {
        SqliteDbErrorKind::Other
    }
}

/// Returns true when the engine error is busy or lock contention.
fn is_contention(err: &rusqlite::Error) -> bool {
    classify_db_error_message(&err.to_string()) != SqliteDbErrorKind::Other
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS items (
                    pk TEXT NOT NULL,
                    sk TEXT NOT NULL,
                    attributes BLOB NOT NULL,
                    PRIMARY KEY (pk, sk)
                ) WITHOUT ROWID;
                CREATE INDEX IF NOT EXISTS idx_items_sort_key ON items (sk, pk);",
            )
            .map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}
