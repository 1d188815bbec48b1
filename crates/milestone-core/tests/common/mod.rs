// crates/milestone-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for milestone-core tests.
// Purpose: Provide grid builders, recording sleepers, and service fixtures.
// Dependencies: milestone-core
// ============================================================================

//! ## Overview
//! Provides grid document builders and a preconfigured project service over
//! the in-memory store for integration tests.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only helpers; not every test binary uses every helper."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use milestone_core::BatchWriter;
use milestone_core::BatchWriterConfig;
use milestone_core::Gate;
use milestone_core::GridDocument;
use milestone_core::InMemoryKeyValueStore;
use milestone_core::Phase;
use milestone_core::ProjectService;
use milestone_core::RetryPolicy;
use milestone_core::Sleeper;
use milestone_core::StageDocument;
use milestone_core::Timestamp;
use milestone_core::runtime::FixedClock;
use milestone_core::runtime::MemoryAuditSink;

/// First idempotency key used across tests.
pub const REQUEST_A: &str = "3f2c5a9e-1d4b-4c8a-9e21-7b6d0f1a2c3d";
/// Second idempotency key used across tests.
pub const REQUEST_B: &str = "8a1e7c44-62f0-4b3d-a5c9-0e9d2b7f6a18";
/// Third idempotency key used across tests.
pub const REQUEST_C: &str = "c0ffee00-1234-4abc-8def-000000000042";

/// Returns a complete document with every cell blank.
pub fn blank_document() -> GridDocument {
    let stages = (1 ..= 8)
        .map(|stage| StageDocument {
            stage,
            description: String::new(),
            gates: Gate::ALL
                .into_iter()
                .map(|gate| {
                    let phases: BTreeMap<Phase, String> =
                        Phase::ALL.into_iter().map(|phase| (phase, String::new())).collect();
                    (gate, phases)
                })
                .collect(),
        })
        .collect();
    GridDocument {
        stages,
    }
}

/// Sets one cell of a document.
pub fn set_cell(document: &mut GridDocument, stage: u8, gate: Gate, phase: Phase, date: &str) {
    let row = document.stages.iter_mut().find(|row| row.stage == stage).expect("stage row");
    row.gates.get_mut(&gate).expect("gate").insert(phase, date.to_string());
}

/// Sets the description of one stage.
pub fn set_description(document: &mut GridDocument, stage: u8, description: &str) {
    let row = document.stages.iter_mut().find(|row| row.stage == stage).expect("stage row");
    row.description = description.to_string();
}

/// Returns a document with a handful of populated cells.
pub fn sample_document() -> GridDocument {
    let mut document = blank_document();
    set_description(&mut document, 1, "Concept");
    set_cell(&mut document, 1, Gate::Zp5, Phase::Vff, "2026-01-01");
    set_cell(&mut document, 1, Gate::Elet, Phase::Pvs, "2026-02-24");
    set_description(&mut document, 3, "Prototype");
    set_cell(&mut document, 3, Gate::Zp7, Phase::Sop, "2026-06-30");
    document
}

/// Sleeper that records requested delays without blocking.
#[derive(Default)]
pub struct RecordingSleeper {
    /// Delays requested so far.
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Returns the recorded delays.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().expect("sleeper lock").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().expect("sleeper lock").push(duration);
    }
}

/// Batch writer over a recording sleeper with a 10ms base delay.
pub fn writer(sleeper: Arc<RecordingSleeper>, audit: Arc<MemoryAuditSink>) -> BatchWriter {
    BatchWriter::new(
        BatchWriterConfig {
            max_batch_size: 25,
            retry: RetryPolicy {
                base_delay: Duration::from_millis(10),
                max_retries: 6,
            },
        },
        sleeper,
        audit,
    )
}

/// Project service fixture with inspectable collaborators.
pub struct Fixture {
    /// Backing store shared with the service.
    pub store: InMemoryKeyValueStore,
    /// Service under test.
    pub service: ProjectService<InMemoryKeyValueStore>,
    /// Audit events.
    pub audit: Arc<MemoryAuditSink>,
    /// Recorded backoff delays.
    pub sleeper: Arc<RecordingSleeper>,
}

/// Builds a project service over a fresh in-memory store.
pub fn fixture() -> Fixture {
    fixture_with_store(InMemoryKeyValueStore::new())
}

/// Builds a project service over the given store.
pub fn fixture_with_store(store: InMemoryKeyValueStore) -> Fixture {
    let audit = Arc::new(MemoryAuditSink::new());
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = ProjectService::new(store.clone(), writer(Arc::clone(&sleeper), Arc::clone(&audit)))
        .with_clock(Arc::new(FixedClock(Timestamp::from_unix_millis(1_767_225_600_000))))
        .with_audit(audit.clone());
    Fixture {
        store,
        service,
        audit,
        sleeper,
    }
}
