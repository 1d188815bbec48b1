// crates/milestone-core/src/core/identifiers.rs
// ============================================================================
// Module: Milestone Identifiers
// Description: Validated identifiers for projects and idempotent requests.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde, thiserror, uuid
// ============================================================================

//! ## Overview
//! Project identifiers are embedded verbatim into partition and sort keys, so
//! they are validated at construction: a `#` would collide with the key
//! delimiter and silently orphan rows. Request identifiers are idempotency
//! tokens and must parse as UUIDs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length of a project identifier.
pub const MAX_PROJECT_ID_LENGTH: usize = 128;
/// Maximum length of a project name.
pub const MAX_PROJECT_NAME_LENGTH: usize = 256;
/// Reserved key delimiter that identifiers must not contain.
const KEY_DELIMITER: char = '#';

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Project identifier failed validation.
    #[error("invalid project id: {0}")]
    ProjectId(String),
    /// Project name failed validation.
    #[error("invalid project name: {0}")]
    ProjectName(String),
    /// Idempotency key is missing or not a UUID.
    #[error("invalid idempotency key: {0}")]
    RequestId(String),
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Project identifier used as the partition-key suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Creates a validated project identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::ProjectId`] when the value is blank, padded
    /// with whitespace, too long, or contains the key delimiter.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdentifierError::ProjectId("must be non-empty".to_string()));
        }
        if value.trim() != value {
            return Err(IdentifierError::ProjectId(
                "must not have leading or trailing whitespace".to_string(),
            ));
        }
        if value.len() > MAX_PROJECT_ID_LENGTH {
            return Err(IdentifierError::ProjectId(format!(
                "exceeds {MAX_PROJECT_ID_LENGTH} characters"
            )));
        }
        if value.contains(KEY_DELIMITER) {
            return Err(IdentifierError::ProjectId(format!(
                "must not contain '{KEY_DELIMITER}'"
            )));
        }
        if value.chars().any(char::is_control) {
            return Err(IdentifierError::ProjectId(
                "must not contain control characters".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}

/// Human-readable project name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    /// Creates a validated project name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::ProjectName`] when the value is blank or too long.
    pub fn parse(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdentifierError::ProjectName("must be non-empty".to_string()));
        }
        if value.chars().count() > MAX_PROJECT_NAME_LENGTH {
            return Err(IdentifierError::ProjectName(format!(
                "exceeds {MAX_PROJECT_NAME_LENGTH} characters"
            )));
        }
        Ok(Self(value))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ProjectName> for String {
    fn from(value: ProjectName) -> Self {
        value.0
    }
}

/// Idempotency token identifying one logical write attempt.
///
/// # Invariants
/// - Always a canonical hyphenated lowercase UUID string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Parses an idempotency key.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::RequestId`] when the key is blank or not a UUID.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::RequestId("idempotency key is required".to_string()));
        }
        let uuid = Uuid::parse_str(trimmed)
            .map_err(|err| IdentifierError::RequestId(format!("{trimmed}: {err}")))?;
        Ok(Self(uuid.hyphenated().to_string()))
    }

    /// Parses an optional idempotency key, treating absence as a client error.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::RequestId`] when the key is absent or malformed.
    pub fn require(value: Option<&str>) -> Result<Self, IdentifierError> {
        value.map_or_else(
            || Err(IdentifierError::RequestId("idempotency key is required".to_string())),
            Self::parse,
        )
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for RequestId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequestId> for String {
    fn from(value: RequestId) -> Self {
        value.0
    }
}
