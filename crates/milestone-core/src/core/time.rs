// crates/milestone-core/src/core/time.rs
// ============================================================================
// Module: Milestone Time Model
// Description: Canonical timestamp representation for record updates.
// Purpose: Keep wall-clock reads at the host boundary.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Records carry an `updatedAt` timestamp in unix milliseconds. The core never
//! reads wall-clock time directly; services receive timestamps from an injected
//! [`Clock`](crate::interfaces::Clock).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Unix epoch milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; no monotonicity is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(value: i64) -> Self {
        Self(value)
    }

    /// Returns the timestamp as unix milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
