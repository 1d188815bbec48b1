// crates/milestone-core/src/core/date.rs
// ============================================================================
// Module: Milestone Dates
// Description: Calendar-valid YYYY-MM-DD dates used as milestone targets.
// Purpose: Reject malformed dates before they reach a partition key.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! A milestone date is part of the date-index partition key, so the textual
//! form must be canonical: exactly `YYYY-MM-DD` with zero padding and a real
//! calendar day. Parsing and formatting both go through one `time` format
//! description so the key text round-trips exactly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Canonical milestone date layout.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Length of the canonical text form; rejects signed or widened years.
const DATE_TEXT_LEN: usize = 10;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Date parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date '{value}': {reason}")]
pub struct DateError {
    /// Rejected input.
    pub value: String,
    /// Rejection reason.
    pub reason: String,
}

impl DateError {
    /// Builds a date error for the given input.
    fn new(value: &str, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Milestone Date
// ============================================================================

/// Calendar-valid milestone date.
///
/// # Invariants
/// - The string form is always `YYYY-MM-DD` and names a real calendar day.
/// - String ordering matches chronological ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MilestoneDate(Date);

impl MilestoneDate {
    /// Parses a strict `YYYY-MM-DD` date.
    ///
    /// # Errors
    ///
    /// Returns [`DateError`] when the text is not zero-padded `YYYY-MM-DD` or
    /// does not name a real calendar day.
    pub fn parse(value: &str) -> Result<Self, DateError> {
        if value.len() != DATE_TEXT_LEN {
            return Err(DateError::new(value, "expected YYYY-MM-DD"));
        }
        let date = Date::parse(value, DATE_FORMAT)
            .map_err(|err| DateError::new(value, err.to_string()))?;
        Ok(Self(date))
    }

    /// Parses an optional cell value; blank text means "no date set".
    ///
    /// # Errors
    ///
    /// Returns [`DateError`] when non-blank text is not a valid date.
    pub fn parse_optional(value: &str) -> Result<Option<Self>, DateError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Self::parse(trimmed).map(Some)
    }

    /// Returns the following calendar day, if representable.
    #[must_use]
    pub fn next_day(self) -> Option<Self> {
        self.0.next_day().map(Self)
    }

    /// Returns the underlying calendar date.
    #[must_use]
    pub const fn date(self) -> Date {
        self.0
    }
}

impl fmt::Display for MilestoneDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.format(DATE_FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl TryFrom<String> for MilestoneDate {
    type Error = DateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MilestoneDate> for String {
    fn from(value: MilestoneDate) -> Self {
        value.to_string()
    }
}
