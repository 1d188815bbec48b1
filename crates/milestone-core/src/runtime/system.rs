// crates/milestone-core/src/runtime/system.rs
// ============================================================================
// Module: Host Clock and Sleeper
// Description: Wall-clock and thread-blocking implementations of host traits.
// Purpose: Provide production defaults for injected time and waiting.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Production hosts use [`SystemClock`] and [`ThreadSleeper`]. Tests inject
//! fixed clocks and recording sleepers instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::Timestamp;
use crate::interfaces::Clock;
use crate::interfaces::Sleeper;

// ============================================================================
// SECTION: Implementations
// ============================================================================

/// Clock reading the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp::from_unix_millis(i64::try_from(now.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Clock returning a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Sleeper blocking the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
