//! Terminal wire protocol
//!
//! JSON frames on `/ws`, tagged by `type` in snake_case. Every request
//! carries an `id` that the matching reply echoes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Frames the terminal sends
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving `change` frames for these paths. Patterns may end in
    /// `/*` or `/**`.
    Subscribe { id: String, paths: Vec<String> },
    Unsubscribe { id: String, paths: Vec<String> },
    /// One-off read of a facility path
    Get { id: String, path: String },
    Lockdown { id: String, sector: String },
    Ping { id: String },
}

/// Frames the server sends
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame on every connection
    Connected { session_id: String, version: String },

    /// Answer to a request, `ok` false when it could not be served
    Reply {
        id: String,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Pushed to subscribers when facility state moves
    Change {
        path: String,
        change: ChangeType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },

    /// Rejected frame. `id` is absent when the frame itself was unreadable.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        code: ErrorCode,
        message: String,
    },

    Pong { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Log entries; the terminal appends rather than replaces
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidRequest,
    NotFound,
    Conflict,
}

impl ServerMessage {
    pub fn connected(session_id: impl Into<String>) -> Self {
        Self::Connected {
            session_id: session_id.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn ok(id: impl Into<String>, data: Value) -> Self {
        Self::Reply {
            id: id.into(),
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn refused(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Reply {
            id: id.into(),
            ok: false,
            data: None,
            error: Some(reason.into()),
        }
    }

    pub fn change(path: impl Into<String>, change: ChangeType, data: Option<Value>) -> Self {
        Self::Change {
            path: path.into(),
            change,
            data,
        }
    }

    pub fn error(id: Option<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            id,
            code,
            message: message.into(),
        }
    }

    pub fn pong(id: impl Into<String>) -> Self {
        Self::Pong { id: id.into() }
    }
}
