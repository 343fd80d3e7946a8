//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionState;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A save-time token did not have the expected shape.
    #[error("invalid save time token: {value}")]
    InvalidSaveTime { value: String },

    /// A session snapshot's fields contradict its state.
    #[error("inconsistent {state} session snapshot")]
    InconsistentSnapshot { state: SessionState },
}

/// Generates a validated string newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated activity name.
    ///
    /// Names are compared exactly: "Reading" and "reading" are different
    /// activities. Surrounding whitespace is preserved as given; callers that
    /// accept free-form input should trim before constructing.
    ActivityName, "activity name"
);

define_string_id!(
    /// Opaque identifier of a stored history record.
    RecordId, "record ID"
);

impl RecordId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Length of a save-time token: `YYYYMMDDHHMMSS` plus six fractional digits.
const SAVE_TIME_LEN: usize = 20;

/// Token recording when a history record was written.
///
/// Formatted as `YYYYMMDDHHMMSSffffff` in UTC so that lexicographic order
/// matches chronological order. Used as the tie-break when two records share
/// a start date.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SaveTime(String);

impl SaveTime {
    /// Builds the token for the given instant.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant.format("%Y%m%d%H%M%S%6f").to_string())
    }

    /// Parses a stored token, checking its shape.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.len() != SAVE_TIME_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidSaveTime { value });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SaveTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SaveTime> for String {
    fn from(token: SaveTime) -> Self {
        token.0
    }
}

impl fmt::Display for SaveTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_name_rejects_empty() {
        assert!(ActivityName::new("").is_err());
        assert!(ActivityName::new("Reading").is_ok());
    }

    #[test]
    fn activity_name_is_case_sensitive() {
        let upper = ActivityName::new("Reading").unwrap();
        let lower = ActivityName::new("reading").unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn activity_name_serde_rejects_empty() {
        let result: Result<ActivityName, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn record_id_generate_is_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }

    #[test]
    fn save_time_orders_chronologically() {
        let earlier = DateTime::parse_from_rfc3339("2025-01-01T09:59:59.999999Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = DateTime::parse_from_rfc3339("2025-01-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let a = SaveTime::at(earlier);
        let b = SaveTime::at(later);
        assert_eq!(a.as_str(), "20250101095959999999");
        assert_eq!(b.as_str(), "20250101100000000000");
        assert!(a < b);
    }

    #[test]
    fn save_time_parse_validates_shape() {
        assert!(SaveTime::parse("20250101100000000000").is_ok());
        assert!(SaveTime::parse("2025-01-01").is_err());
        assert!(SaveTime::parse("2025010110000000000x").is_err());
    }
}
