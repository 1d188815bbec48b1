// crates/milestone-core/src/runtime/batch.rs
// ============================================================================
// Module: Batch Writer
// Description: Chunked batch writes with bounded exponential backoff.
// Purpose: Apply unbounded write lists through a store that accepts small batches.
// Dependencies: crate::{interfaces, runtime::audit}, thiserror
// ============================================================================

//! ## Overview
//! The batch writer splits a request list into store-sized chunks. A store
//! signals partial success by returning the unprocessed subset; only that
//! subset is resubmitted, after sleeping `base * 2^min(attempt, 10)`. A chunk
//! that is still incomplete after the retry ceiling fails the whole write with
//! [`BatchWriteError::Exhausted`]. When the caller supplies a [`Deadline`],
//! the writer refuses to sleep past it and fails with
//! [`BatchWriteError::DeadlineExceeded`] instead.
//!
//! Individual puts and deletes are unconditional, so resubmitting a request
//! that the store did apply is harmless.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

use crate::interfaces::KeyValueStore;
use crate::interfaces::Sleeper;
use crate::interfaces::StoreError;
use crate::interfaces::WriteRequest;
use crate::runtime::audit::AuditSink;
use crate::runtime::audit::BatchRetryAuditEvent;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default delay unit for backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(50);
/// Default retry ceiling per chunk.
pub const DEFAULT_MAX_RETRIES: u32 = 6;
/// Largest exponent applied to the base delay.
pub const MAX_BACKOFF_EXPONENT: u32 = 10;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Backoff policy for unprocessed batch remainders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay unit multiplied by the exponential factor.
    pub base_delay: Duration,
    /// Maximum retries per chunk before failing.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(factor)
    }
}

/// Batch writer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWriterConfig {
    /// Upper bound on requests per store call; the store's own limit also applies.
    pub max_batch_size: usize,
    /// Backoff policy for unprocessed remainders.
    pub retry: RetryPolicy,
}

impl Default for BatchWriterConfig {
    fn default() -> Self {
        Self {
            max_batch_size: crate::interfaces::DEFAULT_MAX_BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

/// Point in time after which no further backoff waits are started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline at an absolute instant.
    #[must_use]
    pub const fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// Deadline the given duration from now.
    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }

    /// Time left before the deadline, zero once passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Returns true once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Batch write failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchWriteError {
    /// Retry ceiling reached with requests still unprocessed.
    #[error("batch write exhausted after {attempts} retries with {unprocessed} unprocessed requests")]
    Exhausted {
        /// Retries performed for the failing chunk.
        attempts: u32,
        /// Requests left unprocessed.
        unprocessed: usize,
    },
    /// Caller deadline reached before the write completed.
    #[error("batch write deadline exceeded with {unprocessed} unprocessed requests")]
    DeadlineExceeded {
        /// Requests left unprocessed.
        unprocessed: usize,
    },
    /// Store rejected a batch outright.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Batch Writer
// ============================================================================

/// Summary of a completed batch write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchWriteReport {
    /// Requests submitted.
    pub requests: usize,
    /// Store calls issued, including retries.
    pub batch_calls: usize,
    /// Retries issued across all chunks.
    pub retries: u32,
}

/// Chunking batch writer with bounded exponential backoff.
#[derive(Clone)]
pub struct BatchWriter {
    /// Writer configuration.
    config: BatchWriterConfig,
    /// Blocking wait between retries.
    sleeper: Arc<dyn Sleeper + Send + Sync>,
    /// Audit sink for retry events.
    audit: Arc<dyn AuditSink>,
}

impl BatchWriter {
    /// Creates a batch writer.
    #[must_use]
    pub fn new(
        config: BatchWriterConfig,
        sleeper: Arc<dyn Sleeper + Send + Sync>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            sleeper,
            audit,
        }
    }

    /// Returns the writer configuration.
    #[must_use]
    pub const fn config(&self) -> &BatchWriterConfig {
        &self.config
    }

    /// Writes every request, chunked to the effective batch size.
    ///
    /// # Errors
    ///
    /// Returns [`BatchWriteError`] when a chunk exhausts its retries, the
    /// deadline passes, or the store rejects a batch.
    pub fn write_all<S>(
        &self,
        store: &S,
        requests: &[WriteRequest],
        deadline: Option<Deadline>,
    ) -> Result<BatchWriteReport, BatchWriteError>
    where
        S: KeyValueStore + ?Sized,
    {
        let chunk_size = self.config.max_batch_size.min(store.max_batch_size()).max(1);
        let mut report = BatchWriteReport {
            requests: requests.len(),
            ..BatchWriteReport::default()
        };
        for (index, chunk) in requests.chunks(chunk_size).enumerate() {
            if deadline.is_some_and(|deadline| deadline.is_expired()) {
                return Err(BatchWriteError::DeadlineExceeded {
                    unprocessed: requests.len() - index * chunk_size,
                });
            }
            let pending_after = requests.len() - index * chunk_size - chunk.len();
            self.write_chunk(store, chunk, pending_after, deadline, &mut report)?;
        }
        Ok(report)
    }

    /// Writes one chunk, retrying its unprocessed remainder.
    ///
    /// `pending_after` counts requests in later chunks not yet submitted.
    fn write_chunk<S>(
        &self,
        store: &S,
        chunk: &[WriteRequest],
        pending_after: usize,
        deadline: Option<Deadline>,
        report: &mut BatchWriteReport,
    ) -> Result<(), BatchWriteError>
    where
        S: KeyValueStore + ?Sized,
    {
        let mut unprocessed = store.batch_write(chunk)?;
        report.batch_calls += 1;
        let mut attempt: u32 = 0;
        while !unprocessed.is_empty() {
            attempt += 1;
            if attempt > self.config.retry.max_retries {
                return Err(BatchWriteError::Exhausted {
                    attempts: self.config.retry.max_retries,
                    unprocessed: unprocessed.len(),
                });
            }
            let delay = self.config.retry.delay_for(attempt);
            if let Some(deadline) = deadline
                && deadline.remaining() < delay
            {
                return Err(BatchWriteError::DeadlineExceeded {
                    unprocessed: unprocessed.len() + pending_after,
                });
            }
            self.audit.record_batch_retry(&BatchRetryAuditEvent::new(
                attempt,
                unprocessed.len(),
                delay.as_millis(),
            ));
            self.sleeper.sleep(delay);
            unprocessed = store.batch_write(&unprocessed)?;
            report.batch_calls += 1;
            report.retries += 1;
        }
        Ok(())
    }
}
