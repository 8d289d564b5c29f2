//! Client wire protocol.
//!
//! Messages are JSON objects tagged by `type`. Unknown types are not errors:
//! they are reported as `Ok(None)` so the actor can ignore them.

use durocache_types::Profile;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Inbound message types the actor understands.
pub const KNOWN_MESSAGE_TYPES: &[&str] = &["update_profile", "get_profile"];

/// Messages sent by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    UpdateProfile {
        profile: Profile,
    },
    GetProfile {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// Messages sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to a connect or `get_profile`, sent to one session.
    Profile { data: Profile },
    /// An accepted write, broadcast to every session.
    ProfileUpdated { profile: Profile },
    /// A rejected stale write, sent to its author only.
    Conflict { id: String },
}

impl ServerMessage {
    /// Renders the message as a JSON text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// An inbound frame that could not be understood.
#[derive(Debug, Error)]
pub enum MalformedMessageError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("message has no type tag")]
    MissingType,

    #[error("invalid {kind} message: {source}")]
    InvalidPayload {
        kind: String,
        source: serde_json::Error,
    },
}

/// Parses one inbound frame.
///
/// Returns `Ok(None)` for a well-formed message with an unrecognized type.
pub fn parse_client_message(raw: &str) -> Result<Option<ClientMessage>, MalformedMessageError> {
    let value: Value = serde_json::from_str(raw).map_err(MalformedMessageError::Json)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(MalformedMessageError::MissingType)?
        .to_string();

    if !KNOWN_MESSAGE_TYPES.contains(&kind.as_str()) {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| MalformedMessageError::InvalidPayload { kind, source })
}
