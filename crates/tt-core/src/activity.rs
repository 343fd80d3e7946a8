//! Named activities the user can time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ActivityName;

/// A named thing the user tracks time against.
///
/// Activities are immutable once registered; identity is the exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: ActivityName,
    /// When the activity was first registered. `None` for names known only
    /// from history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Activity {
    pub const fn new(name: ActivityName, created_at: DateTime<Utc>) -> Self {
        Self {
            name,
            created_at: Some(created_at),
        }
    }

    /// An activity reconstructed from a name without registration metadata.
    pub const fn known(name: ActivityName) -> Self {
        Self {
            name,
            created_at: None,
        }
    }
}
