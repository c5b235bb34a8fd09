//! Chat relay errors and their HTTP rendering

use axum::Json;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const CHAT_PATH: &str = "/api/chat";

#[derive(Debug, Clone, thiserror::Error)]
pub enum RelayError {
    #[error("Request body is required")]
    BodyRequired,

    #[error("Invalid JSON in request body: {0}")]
    InvalidJson(String),

    #[error("Messages array is required")]
    MessagesRequired,

    #[error("Invalid message at index {index}: {reason}")]
    InvalidMessage { index: usize, reason: String },

    #[error("Failed to initialize AI model")]
    ProviderUnavailable,

    #[error("Model provider error: {0}")]
    Provider(String),
}

impl RelayError {
    /// Client input problems are 400, everything else is 500
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BodyRequired
            | RelayError::InvalidJson(_)
            | RelayError::MessagesRequired
            | RelayError::InvalidMessage { .. } => StatusCode::BAD_REQUEST,
            RelayError::ProviderUnavailable | RelayError::Provider(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON body of every failed `/api/chat` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ErrorBody {
    pub error: String,
    /// ISO-8601, UTC, millisecond precision
    pub timestamp: String,
    pub path: String,
    pub status: u16,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, status: StatusCode) -> Self {
        Self {
            error: error.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: CHAT_PATH.to_string(),
            status: status.as_u16(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody::new(self.to_string(), status);

        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert("x-error-code", HeaderValue::from(status.as_u16()));
        response
    }
}
