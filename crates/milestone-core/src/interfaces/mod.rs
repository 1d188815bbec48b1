// crates/milestone-core/src/interfaces/mod.rs
// ============================================================================
// Module: Milestone Interfaces
// Description: Backend-agnostic interfaces for storage, time, and waiting.
// Purpose: Define the contract surfaces used by the milestone runtime.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces describe the key-value store the runtime depends on without
//! tying it to any vendor client. The store contract mirrors a partitioned
//! table: single-item reads, conditional writes, cursor queries within one
//! partition, and batch writes that may leave an unprocessed remainder.
//! Conditions are evaluated by [`Condition::evaluate`] in every backend so all
//! stores agree on compare-and-swap semantics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::core::Attributes;
use crate::core::Item;
use crate::core::ItemKey;
use crate::core::RecordError;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("key-value store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("key-value store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("key-value store version mismatch: {0}")]
    VersionMismatch(String),
    /// Request rejected as invalid by the store.
    #[error("key-value store invalid request: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("key-value store error: {0}")]
    Store(String),
}

impl From<RecordError> for StoreError {
    fn from(error: RecordError) -> Self {
        match error {
            RecordError::Encode(message) => Self::Invalid(message),
            other => Self::Corrupt(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Read consistency for single-item reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadConsistency {
    /// Read may lag recent writes.
    Eventual,
    /// Read reflects all acknowledged writes.
    Strong,
}

/// Precondition evaluated atomically with a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Write unconditionally.
    Always,
    /// Item must not exist.
    NotExists,
    /// Item must exist with the attribute equal to the value.
    AttributeEquals {
        /// Attribute name.
        name: String,
        /// Expected value.
        value: Value,
    },
    /// Every nested condition must hold.
    All(Vec<Self>),
}

impl Condition {
    /// Builds an attribute equality condition.
    #[must_use]
    pub fn equals(name: &str, value: impl Into<Value>) -> Self {
        Self::AttributeEquals {
            name: name.to_string(),
            value: value.into(),
        }
    }

    /// Evaluates the condition against the current item, if any.
    #[must_use]
    pub fn evaluate(&self, existing: Option<&Item>) -> bool {
        match self {
            Self::Always => true,
            Self::NotExists => existing.is_none(),
            Self::AttributeEquals {
                name,
                value,
            } => existing.and_then(|item| item.attribute(name)).is_some_and(|found| found == value),
            Self::All(conditions) => {
                conditions.iter().all(|condition| condition.evaluate(existing))
            }
        }
    }
}

/// Outcome of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalWrite {
    /// Condition held and the write was applied.
    Applied,
    /// Condition failed; nothing was written.
    ConditionFailed,
}

impl ConditionalWrite {
    /// Returns true when the write was applied.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Sort key restriction for a partition query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyCondition {
    /// Every item in the partition.
    All,
    /// Items whose sort key starts with the prefix.
    BeginsWith(String),
    /// The single item with this sort key.
    Equals(String),
}

impl SortKeyCondition {
    /// Returns true when the sort key satisfies the restriction.
    #[must_use]
    pub fn matches(&self, sort_key: &str) -> bool {
        match self {
            Self::All => true,
            Self::BeginsWith(prefix) => sort_key.starts_with(prefix.as_str()),
            Self::Equals(expected) => sort_key == expected,
        }
    }
}

/// Single-partition query in ascending sort key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Partition to read.
    pub partition_key: String,
    /// Sort key restriction.
    pub sort_key: SortKeyCondition,
    /// Resume strictly after this sort key.
    pub exclusive_start: Option<String>,
    /// Maximum items to return; must be non-zero.
    pub limit: usize,
}

/// One page of query or scan results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPage {
    /// Items in key order.
    pub items: Vec<Item>,
    /// Key of the last evaluated item when the page filled its limit.
    pub last_evaluated_key: Option<ItemKey>,
}

/// One request within a batch write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    /// Unconditional put.
    Put(Item),
    /// Unconditional delete by key.
    Delete(ItemKey),
}

impl WriteRequest {
    /// Key targeted by the request.
    #[must_use]
    pub const fn key(&self) -> &ItemKey {
        match self {
            Self::Put(item) => &item.key,
            Self::Delete(key) => key,
        }
    }
}

// ============================================================================
// SECTION: Key-Value Store
// ============================================================================

/// Default batch size accepted by partitioned stores.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;

/// Partitioned key-value store keyed by `(pk, sk)`.
pub trait KeyValueStore {
    /// Reads one item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn get_item(
        &self,
        key: &ItemKey,
        consistency: ReadConsistency,
    ) -> Result<Option<Item>, StoreError>;

    /// Writes an item when the condition holds against the current item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails for reasons other than the condition.
    fn put_item(&self, item: &Item, condition: &Condition) -> Result<ConditionalWrite, StoreError>;

    /// Merges attributes into an existing item when the condition holds.
    ///
    /// A missing item always fails the condition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails for reasons other than the condition.
    fn update_item(
        &self,
        key: &ItemKey,
        attributes: &Attributes,
        condition: &Condition,
    ) -> Result<ConditionalWrite, StoreError>;

    /// Reads one page of a partition in ascending sort key order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails or the limit is zero.
    fn query(&self, request: &QueryRequest) -> Result<QueryPage, StoreError>;

    /// Reads one page of items with the given sort key across all partitions,
    /// ordered by partition key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the scan fails or the limit is zero.
    fn scan_sort_key(
        &self,
        sort_key: &str,
        exclusive_start: Option<&ItemKey>,
        limit: usize,
    ) -> Result<QueryPage, StoreError>;

    /// Applies a batch of unconditional writes and returns the unprocessed remainder.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the batch is rejected outright, including
    /// batches larger than [`KeyValueStore::max_batch_size`].
    fn batch_write(&self, requests: &[WriteRequest]) -> Result<Vec<WriteRequest>, StoreError>;

    /// Largest batch accepted by [`KeyValueStore::batch_write`].
    fn max_batch_size(&self) -> usize {
        DEFAULT_MAX_BATCH_SIZE
    }
}

// ============================================================================
// SECTION: Time and Waiting
// ============================================================================

/// Source of record timestamps.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Blocking wait used between batch retries.
pub trait Sleeper {
    /// Blocks for the given duration.
    fn sleep(&self, duration: Duration);
}
