// crates/milestone-core/src/core/item.rs
// ============================================================================
// Module: Key-Value Items
// Description: Untyped (pk, sk) items exchanged with key-value stores.
// Purpose: Provide the storage-neutral item shape and typed record codecs.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Stores persist flat items: a two-part key plus a JSON attribute map.
//! Typed records encode into attributes with `serde`; decoding verifies that
//! the key an item was stored under matches the key derived from its payload,
//! so a misplaced row fails closed instead of being silently misread.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Attribute map of an item.
pub type Attributes = Map<String, Value>;

/// Two-part primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    /// Partition key.
    pub pk: String,
    /// Sort key.
    pub sk: String,
}

impl ItemKey {
    /// Creates an item key.
    #[must_use]
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.pk, self.sk)
    }
}

/// Stored item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Primary key.
    pub key: ItemKey,
    /// Attribute payload.
    pub attributes: Attributes,
}

/// Record encode/decode errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Record could not be encoded into attributes.
    #[error("record encode error: {0}")]
    Encode(String),
    /// Attributes could not be decoded into a record.
    #[error("record decode error at {key}: {message}")]
    Decode {
        /// Key of the offending item.
        key: ItemKey,
        /// Decoder message.
        message: String,
    },
    /// Stored key disagrees with the key derived from the payload.
    #[error("record key mismatch: stored {stored}, derived {derived}")]
    KeyMismatch {
        /// Key the item was stored under.
        stored: ItemKey,
        /// Key derived from the payload.
        derived: ItemKey,
    },
}

impl Item {
    /// Creates an item from a key and attributes.
    #[must_use]
    pub const fn new(key: ItemKey, attributes: Attributes) -> Self {
        Self {
            key,
            attributes,
        }
    }

    /// Encodes a serializable record under the given key.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Encode`] when the record does not serialize to an object.
    pub fn from_record<T: Serialize>(key: ItemKey, record: &T) -> Result<Self, RecordError> {
        match serde_json::to_value(record) {
            Ok(Value::Object(attributes)) => Ok(Self::new(key, attributes)),
            Ok(_) => Err(RecordError::Encode("record must serialize to an object".to_string())),
            Err(err) => Err(RecordError::Encode(err.to_string())),
        }
    }

    /// Decodes the attributes into a typed record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Decode`] when the attributes do not match the record shape.
    pub fn to_record<T: DeserializeOwned>(&self) -> Result<T, RecordError> {
        serde_json::from_value(Value::Object(self.attributes.clone())).map_err(|err| {
            RecordError::Decode {
                key: self.key.clone(),
                message: err.to_string(),
            }
        })
    }

    /// Returns an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Verifies a decoded record was stored under its derived key.
///
/// # Errors
///
/// Returns [`RecordError::KeyMismatch`] when the keys differ.
pub fn verify_key(stored: &ItemKey, derived: ItemKey) -> Result<(), RecordError> {
    if *stored == derived {
        Ok(())
    } else {
        Err(RecordError::KeyMismatch {
            stored: stored.clone(),
            derived,
        })
    }
}
