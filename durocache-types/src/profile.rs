//! The cached profile entity.

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Display name given to a freshly synthesized profile.
pub const STUB_NAME: &str = "New User";

/// Email given to a freshly synthesized profile.
pub const STUB_EMAIL: &str = "";

/// A user profile as cached by its actor instance.
///
/// `data` is opaque to the cache; only `id` and `last_updated` take part in
/// conflict detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub data: serde_json::Value,
    pub last_updated: Timestamp,
}

impl Profile {
    pub fn new(id: impl Into<String>, data: serde_json::Value, last_updated: Timestamp) -> Self {
        Self {
            id: id.into(),
            data,
            last_updated,
        }
    }

    /// Creates the default profile used when an id is read before any write.
    pub fn stub(id: impl Into<String>, now: Timestamp) -> Self {
        Self::new(id, json!({ "name": STUB_NAME, "email": STUB_EMAIL }), now)
    }

    /// Returns a copy stamped with a new `last_updated`.
    pub fn stamped(&self, last_updated: Timestamp) -> Self {
        Self {
            last_updated,
            ..self.clone()
        }
    }
}
