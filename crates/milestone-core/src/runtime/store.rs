// crates/milestone-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Key-Value Store
// Description: Ordered in-memory key-value store with instrumentation.
// Purpose: Provide a deterministic store for tests, demos, and the CLI.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryKeyValueStore`] keeps items in a `BTreeMap` ordered by
//! `(pk, sk)`, which gives partition queries and sort key scans the same
//! ordering a partitioned table provides. It counts every call in
//! [`StoreStats`] and can be scripted with [`BatchFault`]s to simulate
//! throttled or failing batch writes. It is not a durable store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Attributes;
use crate::core::Item;
use crate::core::ItemKey;
use crate::interfaces::Condition;
use crate::interfaces::ConditionalWrite;
use crate::interfaces::DEFAULT_MAX_BATCH_SIZE;
use crate::interfaces::KeyValueStore;
use crate::interfaces::QueryPage;
use crate::interfaces::QueryRequest;
use crate::interfaces::ReadConsistency;
use crate::interfaces::StoreError;
use crate::interfaces::WriteRequest;

// ============================================================================
// SECTION: Instrumentation
// ============================================================================

/// Call counters for an in-memory store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Single-item reads.
    pub get_items: usize,
    /// Partition queries.
    pub queries: usize,
    /// Sort key scans.
    pub scans: usize,
    /// Conditional puts and updates attempted.
    pub conditional_writes: usize,
    /// Conditional writes whose condition failed.
    pub condition_failures: usize,
    /// Batch write calls.
    pub batch_calls: usize,
    /// Puts applied through batch writes.
    pub batch_puts: usize,
    /// Deletes applied through batch writes.
    pub batch_deletes: usize,
}

impl StoreStats {
    /// Total store reads of any kind.
    #[must_use]
    pub const fn reads(&self) -> usize {
        self.get_items + self.queries + self.scans
    }

    /// Total items written by batch writes.
    #[must_use]
    pub const fn batch_items(&self) -> usize {
        self.batch_puts + self.batch_deletes
    }
}

/// Scripted outcome for one upcoming batch write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchFault {
    /// Apply the batch normally.
    Pass,
    /// Apply nothing and return every request as unprocessed.
    AllUnprocessed,
    /// Apply all but the last `n` requests and return those as unprocessed.
    TailUnprocessed(usize),
    /// Apply nothing and fail the call.
    Fail(StoreError),
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable store state guarded by one mutex.
#[derive(Debug, Default)]
struct StoreState {
    /// Items ordered by `(pk, sk)`.
    items: BTreeMap<ItemKey, Attributes>,
    /// Call counters.
    stats: StoreStats,
    /// Pending batch faults, consumed one per batch call.
    faults: VecDeque<BatchFault>,
}

/// In-memory key-value store for tests and local use.
#[derive(Debug, Clone)]
pub struct InMemoryKeyValueStore {
    /// Shared store state.
    state: Arc<Mutex<StoreState>>,
    /// Largest accepted batch.
    max_batch_size: usize,
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKeyValueStore {
    /// Creates an empty store with the default batch limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_batch_size(DEFAULT_MAX_BATCH_SIZE)
    }

    /// Creates an empty store with an explicit batch limit.
    #[must_use]
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Queues scripted outcomes for upcoming batch write calls.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn push_batch_faults(
        &self,
        faults: impl IntoIterator<Item = BatchFault>,
    ) -> Result<(), StoreError> {
        self.lock()?.faults.extend(faults);
        Ok(())
    }

    /// Returns a snapshot of the call counters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(self.lock()?.stats)
    }

    /// Resets the call counters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn reset_stats(&self) -> Result<(), StoreError> {
        self.lock()?.stats = StoreStats::default();
        Ok(())
    }

    /// Returns every stored item in key order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store mutex is poisoned.
    pub fn snapshot(&self) -> Result<Vec<Item>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .items
            .iter()
            .map(|(key, attributes)| Item::new(key.clone(), attributes.clone()))
            .collect())
    }

    /// Locks the store state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Store("key-value store mutex poisoned".to_string()))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get_item(
        &self,
        key: &ItemKey,
        _consistency: ReadConsistency,
    ) -> Result<Option<Item>, StoreError> {
        let mut guard = self.lock()?;
        guard.stats.get_items += 1;
        Ok(guard.items.get(key).map(|attributes| Item::new(key.clone(), attributes.clone())))
    }

    fn put_item(&self, item: &Item, condition: &Condition) -> Result<ConditionalWrite, StoreError> {
        let mut guard = self.lock()?;
        guard.stats.conditional_writes += 1;
        let existing =
            guard.items.get(&item.key).map(|attributes| Item::new(item.key.clone(), attributes.clone()));
        if !condition.evaluate(existing.as_ref()) {
            guard.stats.condition_failures += 1;
            return Ok(ConditionalWrite::ConditionFailed);
        }
        guard.items.insert(item.key.clone(), item.attributes.clone());
        Ok(ConditionalWrite::Applied)
    }

    fn update_item(
        &self,
        key: &ItemKey,
        attributes: &Attributes,
        condition: &Condition,
    ) -> Result<ConditionalWrite, StoreError> {
        let mut guard = self.lock()?;
        guard.stats.conditional_writes += 1;
        let Some(current) = guard.items.get(key).cloned() else {
            guard.stats.condition_failures += 1;
            return Ok(ConditionalWrite::ConditionFailed);
        };
        let mut merged = Item::new(key.clone(), current);
        if !condition.evaluate(Some(&merged)) {
            guard.stats.condition_failures += 1;
            return Ok(ConditionalWrite::ConditionFailed);
        }
        for (name, value) in attributes {
            merged.attributes.insert(name.clone(), value.clone());
        }
        guard.items.insert(merged.key, merged.attributes);
        Ok(ConditionalWrite::Applied)
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryPage, StoreError> {
        if request.limit == 0 {
            return Err(StoreError::Invalid("query limit must be greater than zero".to_string()));
        }
        let mut guard = self.lock()?;
        guard.stats.queries += 1;
        let lower = match &request.exclusive_start {
            Some(sort_key) => {
                Bound::Excluded(ItemKey::new(request.partition_key.clone(), sort_key.clone()))
            }
            None => Bound::Included(ItemKey::new(request.partition_key.clone(), String::new())),
        };
        let items: Vec<Item> = guard
            .items
            .range((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.pk == request.partition_key)
            .filter(|(key, _)| request.sort_key.matches(&key.sk))
            .take(request.limit)
            .map(|(key, attributes)| Item::new(key.clone(), attributes.clone()))
            .collect();
        Ok(page(items, request.limit))
    }

    fn scan_sort_key(
        &self,
        sort_key: &str,
        exclusive_start: Option<&ItemKey>,
        limit: usize,
    ) -> Result<QueryPage, StoreError> {
        if limit == 0 {
            return Err(StoreError::Invalid("scan limit must be greater than zero".to_string()));
        }
        let mut guard = self.lock()?;
        guard.stats.scans += 1;
        let lower = exclusive_start.map_or(Bound::Unbounded, |key| Bound::Excluded(key.clone()));
        let items: Vec<Item> = guard
            .items
            .range((lower, Bound::Unbounded))
            .filter(|(key, _)| key.sk == sort_key)
            .take(limit)
            .map(|(key, attributes)| Item::new(key.clone(), attributes.clone()))
            .collect();
        Ok(page(items, limit))
    }

    fn batch_write(&self, requests: &[WriteRequest]) -> Result<Vec<WriteRequest>, StoreError> {
        if requests.len() > self.max_batch_size {
            return Err(StoreError::Invalid(format!(
                "batch of {} requests exceeds limit {}",
                requests.len(),
                self.max_batch_size
            )));
        }
        let mut guard = self.lock()?;
        guard.stats.batch_calls += 1;
        let applied = match guard.faults.pop_front().unwrap_or(BatchFault::Pass) {
            BatchFault::Pass => requests.len(),
            BatchFault::AllUnprocessed => 0,
            BatchFault::TailUnprocessed(count) => requests.len().saturating_sub(count),
            BatchFault::Fail(error) => return Err(error),
        };
        let (apply, unprocessed) = requests.split_at(applied);
        for request in apply {
            match request {
                WriteRequest::Put(item) => {
                    guard.stats.batch_puts += 1;
                    guard.items.insert(item.key.clone(), item.attributes.clone());
                }
                WriteRequest::Delete(key) => {
                    guard.stats.batch_deletes += 1;
                    guard.items.remove(key);
                }
            }
        }
        Ok(unprocessed.to_vec())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}

/// Builds a page, setting the continuation key only when the limit was reached.
fn page(items: Vec<Item>, limit: usize) -> QueryPage {
    let last_evaluated_key =
        if items.len() == limit { items.last().map(|item| item.key.clone()) } else { None };
    QueryPage {
        items,
        last_evaluated_key,
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared key-value store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedKeyValueStore {
    /// Inner store implementation.
    inner: Arc<dyn KeyValueStore + Send + Sync>,
}

impl SharedKeyValueStore {
    /// Wraps a store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl KeyValueStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl KeyValueStore for SharedKeyValueStore {
    fn get_item(
        &self,
        key: &ItemKey,
        consistency: ReadConsistency,
    ) -> Result<Option<Item>, StoreError> {
        self.inner.get_item(key, consistency)
    }

    fn put_item(&self, item: &Item, condition: &Condition) -> Result<ConditionalWrite, StoreError> {
        self.inner.put_item(item, condition)
    }

    fn update_item(
        &self,
        key: &ItemKey,
        attributes: &Attributes,
        condition: &Condition,
    ) -> Result<ConditionalWrite, StoreError> {
        self.inner.update_item(key, attributes, condition)
    }

    fn query(&self, request: &QueryRequest) -> Result<QueryPage, StoreError> {
        self.inner.query(request)
    }

    fn scan_sort_key(
        &self,
        sort_key: &str,
        exclusive_start: Option<&ItemKey>,
        limit: usize,
    ) -> Result<QueryPage, StoreError> {
        self.inner.scan_sort_key(sort_key, exclusive_start, limit)
    }

    fn batch_write(&self, requests: &[WriteRequest]) -> Result<Vec<WriteRequest>, StoreError> {
        self.inner.batch_write(requests)
    }

    fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size()
    }
}
