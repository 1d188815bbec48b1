// crates/milestone-core/src/runtime/due.rs
// ============================================================================
// Module: Due-Date Query Service
// Description: Paginated reads of the date index for one day or a day range.
// Purpose: Answer "what is due on day D" without scanning projects.
// Dependencies: crate::{core, interfaces, runtime::lifecycle}, serde
// ============================================================================

//! ## Overview
//! Each day is one date index partition. [`DueDateService::get_due_date`]
//! reads one page of it, resuming strictly after the caller's page token. The
//! next token is the last returned sort key, and is only issued when the page
//! came back full; a short page ends the day. A full page may still be the
//! last one, in which case the following page is empty.
//!
//! [`DueDateService::get_due_date_range`] reads the first page of each day in
//! `[start, start + days)` and returns each day's continuation token so callers
//! can finish a day with `get_due_date`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::DateIndexEntry;
use crate::core::MilestoneDate;
use crate::core::keys;
use crate::interfaces::KeyValueStore;
use crate::interfaces::QueryRequest;
use crate::interfaces::SortKeyCondition;
use crate::runtime::lifecycle::ProjectError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default page size for due-date reads.
pub const DEFAULT_PAGE_LIMIT: usize = 50;
/// Largest page size for due-date reads.
pub const MAX_PAGE_LIMIT: usize = 100;
/// Default number of days in a range read.
pub const DEFAULT_RANGE_DAYS: u32 = 21;
/// Largest number of days in a range read.
pub const MAX_RANGE_DAYS: u32 = 60;

/// Due-date query limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDateConfig {
    /// Page size when the caller gives none.
    pub default_limit: usize,
    /// Upper clamp for page size.
    pub max_limit: usize,
    /// Range length when the caller gives none.
    pub default_days: u32,
    /// Upper clamp for range length.
    pub max_days: u32,
}

impl Default for DueDateConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
            default_days: DEFAULT_RANGE_DAYS,
            max_days: MAX_RANGE_DAYS,
        }
    }
}

impl DueDateConfig {
    /// Resolves a caller page size into `1..=max_limit`, never above
    /// [`MAX_PAGE_LIMIT`].
    #[must_use]
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).clamp(1, self.max_limit.clamp(1, MAX_PAGE_LIMIT))
    }

    /// Resolves a caller range length into `1..=max_days`, never above
    /// [`MAX_RANGE_DAYS`].
    #[must_use]
    pub fn range_days(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_days).clamp(1, self.max_days.clamp(1, MAX_RANGE_DAYS))
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// One page of a day's due entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDatePage {
    /// Day read.
    pub date: MilestoneDate,
    /// Entries in sort key order.
    pub items: Vec<DateIndexEntry>,
    /// Token for the next page, present only when this page was full.
    pub next_page_token: Option<String>,
}

/// First pages of a range of days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDateRange {
    /// First day of the range.
    pub start_date: MilestoneDate,
    /// Days covered after clamping.
    pub days: u32,
    /// One page per day in ascending date order.
    pub pages: Vec<DueDatePage>,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Read-only due-date query service.
pub struct DueDateService<S> {
    /// Backing store.
    store: S,
    /// Query limits.
    config: DueDateConfig,
}

impl<S: KeyValueStore> DueDateService<S> {
    /// Creates a due-date service.
    #[must_use]
    pub const fn new(store: S, config: DueDateConfig) -> Self {
        Self {
            store,
            config,
        }
    }

    /// Reads one page of entries due on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Validation`] for a malformed date or page token,
    /// before touching the store, and [`ProjectError::Store`] when the read fails.
    pub fn get_due_date(
        &self,
        date: &str,
        page_token: Option<&str>,
        limit: Option<usize>,
    ) -> Result<DueDatePage, ProjectError> {
        let date = MilestoneDate::parse(date)?;
        let page_token = parse_page_token(page_token)?;
        self.read_day(date, page_token, self.config.page_limit(limit))
    }

    /// Reads the first page of each day in `[start_date, start_date + days)`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Validation`] for a malformed start date and
    /// [`ProjectError::Store`] when a read fails.
    pub fn get_due_date_range(
        &self,
        start_date: &str,
        days: Option<u32>,
        limit: Option<usize>,
    ) -> Result<DueDateRange, ProjectError> {
        let start_date = MilestoneDate::parse(start_date)?;
        let days = self.config.range_days(days);
        let limit = self.config.page_limit(limit);
        let mut pages = Vec::new();
        let mut current = Some(start_date);
        for _ in 0 .. days {
            let Some(date) = current else {
                break;
            };
            pages.push(self.read_day(date, None, limit)?);
            current = date.next_day();
        }
        Ok(DueDateRange {
            start_date,
            days,
            pages,
        })
    }

    /// Reads one page of a date partition.
    fn read_day(
        &self,
        date: MilestoneDate,
        page_token: Option<String>,
        limit: usize,
    ) -> Result<DueDatePage, ProjectError> {
        let page = self.store.query(&QueryRequest {
            partition_key: keys::date_partition(&date),
            sort_key: SortKeyCondition::BeginsWith(keys::PROJECT_PREFIX.to_string()),
            exclusive_start: page_token,
            limit,
        })?;
        let items = page
            .items
            .iter()
            .map(DateIndexEntry::from_item)
            .collect::<Result<Vec<_>, _>>()?;
        let next_page_token = if page.items.len() == limit {
            page.items.last().map(|item| item.key.sk.clone())
        } else {
            None
        };
        Ok(DueDatePage {
            date,
            items,
            next_page_token,
        })
    }
}

/// Validates a caller page token; blank tokens mean "first page".
fn parse_page_token(token: Option<&str>) -> Result<Option<String>, ProjectError> {
    match token.map(str::trim) {
        None | Some("") => Ok(None),
        Some(token) if token.starts_with(keys::PROJECT_PREFIX) => Ok(Some(token.to_string())),
        Some(_) => Err(ProjectError::Validation(format!(
            "page token must start with {}",
            keys::PROJECT_PREFIX
        ))),
    }
}
