//! Facility HTTP endpoints
//!
//! Reads come from the latest snapshot. Lockdowns are queued for the
//! facility service and answered with 202.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::facility::{FacilityError, FacilitySnapshot, SystemMessage};

use super::state::AppState;

pub async fn snapshot(State(state): State<AppState>) -> Json<FacilitySnapshot> {
    Json(state.snapshot())
}

pub async fn log(State(state): State<AppState>) -> Json<Vec<SystemMessage>> {
    Json(state.snapshot().log)
}

#[derive(Debug, Serialize)]
struct LockdownAccepted {
    sector: String,
    status: &'static str,
}

pub async fn lockdown(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, HttpFacilityError> {
    state.request_lockdown(&code)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(LockdownAccepted {
            sector: code,
            status: "pending",
        }),
    ))
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    error: String,
    status: u16,
}

/// A [`FacilityError`] rendered as a JSON error response
#[derive(Debug)]
pub struct HttpFacilityError {
    status: StatusCode,
    message: String,
}

impl From<FacilityError> for HttpFacilityError {
    fn from(err: FacilityError) -> Self {
        let status = match err {
            FacilityError::UnknownSector(_) => StatusCode::NOT_FOUND,
            FacilityError::NoLockdownControl(_) => StatusCode::CONFLICT,
            FacilityError::InvalidTable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for HttpFacilityError {
    fn into_response(self) -> Response {
        let payload = ErrorPayload {
            error: self.message,
            status: self.status.as_u16(),
        };
        (self.status, Json(payload)).into_response()
    }
}
