// crates/milestone-config/src/config.rs
// ============================================================================
// Module: Milestone Configuration
// Description: Configuration loading and validation for milestone services.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: milestone-core, milestone-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing sections fall back to defaults; out-of-range values fail closed.
//! Validated sections convert into [`BatchWriterConfig`], [`DueDateConfig`],
//! and [`SqliteStoreConfig`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use milestone_core::BatchWriterConfig;
use milestone_core::DueDateConfig;
use milestone_core::RetryPolicy;
use milestone_core::interfaces::DEFAULT_MAX_BATCH_SIZE;
use milestone_core::runtime::due::DEFAULT_PAGE_LIMIT;
use milestone_core::runtime::due::DEFAULT_RANGE_DAYS;
use milestone_core::runtime::due::MAX_PAGE_LIMIT;
use milestone_core::runtime::due::MAX_RANGE_DAYS;
use milestone_store_sqlite::SqliteStoreConfig;
use milestone_store_sqlite::SqliteStoreMode;
use milestone_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "milestone.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "MILESTONE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Largest batch size a partitioned store accepts.
const MAX_BATCH_SIZE: usize = DEFAULT_MAX_BATCH_SIZE;
/// Default backoff delay unit in milliseconds.
const DEFAULT_BASE_DELAY_MS: u64 = 50;
/// Largest backoff delay unit in milliseconds.
const MAX_BASE_DELAY_MS: u64 = 10_000;
/// Default retry ceiling per chunk.
const DEFAULT_MAX_RETRIES: u32 = 6;
/// Largest retry ceiling per chunk.
const MAX_RETRIES: u32 = 10;
/// Largest operation deadline in milliseconds.
const MAX_DEADLINE_MS: u64 = 15 * 60 * 1_000;
/// Default busy timeout for `SQLite` connections.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Milestone service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MilestoneConfig {
    /// Key-value store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Batch writer configuration.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Due-date query limits.
    #[serde(default)]
    pub due_dates: DueDatesConfig,
    /// Audit output configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl MilestoneConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then `MILESTONE_CONFIG`, then
    /// `milestone.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Parses and validates configuration bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the content is oversized, not UTF-8,
    /// malformed, or invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.batch.validate()?;
        self.due_dates.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// Key-value store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use `SQLite`-backed durable store.
    Sqlite,
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Largest batch accepted by the store.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "store max_batch_size must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| ConfigError::Invalid("sqlite store requires path".to_string()))?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "store busy_timeout_ms must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Returns the `SQLite` store configuration for the sqlite backend.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
                max_batch_size: self.max_batch_size,
            }),
            _ => None,
        }
    }
}

/// Batch writer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BatchConfig {
    /// Upper bound on requests per store call.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Backoff delay unit in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Retry ceiling per chunk.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Optional per-operation deadline in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            base_delay_ms: default_base_delay_ms(),
            max_retries: default_max_retries(),
            deadline_ms: None,
        }
    }
}

impl BatchConfig {
    /// Validates batch configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "batch max_batch_size must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        if self.base_delay_ms == 0 || self.base_delay_ms > MAX_BASE_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "batch base_delay_ms must be between 1 and {MAX_BASE_DELAY_MS}"
            )));
        }
        if self.max_retries == 0 || self.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "batch max_retries must be between 1 and {MAX_RETRIES}"
            )));
        }
        if let Some(deadline_ms) = self.deadline_ms
            && (deadline_ms == 0 || deadline_ms > MAX_DEADLINE_MS)
        {
            return Err(ConfigError::Invalid(format!(
                "batch deadline_ms must be between 1 and {MAX_DEADLINE_MS}"
            )));
        }
        Ok(())
    }

    /// Returns the batch writer configuration.
    #[must_use]
    pub const fn writer_config(&self) -> BatchWriterConfig {
        BatchWriterConfig {
            max_batch_size: self.max_batch_size,
            retry: RetryPolicy {
                base_delay: Duration::from_millis(self.base_delay_ms),
                max_retries: self.max_retries,
            },
        }
    }

    /// Returns the per-operation deadline budget, if configured.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// Due-date query limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DueDatesConfig {
    /// Page size when the caller gives none.
    #[serde(default = "default_page_limit")]
    pub default_limit: usize,
    /// Upper clamp for page size.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Range length when the caller gives none.
    #[serde(default = "default_range_days")]
    pub default_days: u32,
    /// Upper clamp for range length.
    #[serde(default = "default_max_days")]
    pub max_days: u32,
}

impl Default for DueDatesConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_limit(),
            default_days: default_range_days(),
            max_days: default_max_days(),
        }
    }
}

impl DueDatesConfig {
    /// Validates due-date limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit == 0 || self.max_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "due_dates max_limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigError::Invalid(
                "due_dates default_limit must be between 1 and max_limit".to_string(),
            ));
        }
        if self.max_days == 0 || self.max_days > MAX_RANGE_DAYS {
            return Err(ConfigError::Invalid(format!(
                "due_dates max_days must be between 1 and {MAX_RANGE_DAYS}"
            )));
        }
        if self.default_days == 0 || self.default_days > self.max_days {
            return Err(ConfigError::Invalid(
                "due_dates default_days must be between 1 and max_days".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the due-date service configuration.
    #[must_use]
    pub const fn service_config(&self) -> DueDateConfig {
        DueDateConfig {
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            default_days: self.default_days,
            max_days: self.max_days,
        }
    }
}

/// Audit output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Emit audit events.
    #[serde(default)]
    pub enabled: bool,
    /// Append JSON lines to this file instead of stderr.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            if !self.enabled {
                return Err(ConfigError::Invalid(
                    "audit.path requires audit.enabled = true".to_string(),
                ));
            }
            validate_path_string("audit.path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default batch size.
const fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}

/// Returns the default backoff delay unit.
const fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

/// Returns the default retry ceiling.
const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Returns the default due-date page size.
const fn default_page_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

/// Returns the default due-date page size clamp.
const fn default_max_limit() -> usize {
    MAX_PAGE_LIMIT
}

/// Returns the default range length.
const fn default_range_days() -> u32 {
    DEFAULT_RANGE_DAYS
}

/// Returns the default range length clamp.
const fn default_max_days() -> u32 {
    MAX_RANGE_DAYS
}

// ============================================================================
// SECTION: Tests
// ============================================================================
