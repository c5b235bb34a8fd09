//! `POST /api/chat`

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{self, HeaderName};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;

use crate::relay::{RelayError, parse_request};

use super::state::AppState;

const DATA_STREAM_HEADER: HeaderName = HeaderName::from_static("x-vercel-ai-data-stream");

pub async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    match stream_reply(&state, &body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, status = e.status().as_u16(), "Chat request failed");
            e.into_response()
        }
    }
}

async fn stream_reply(state: &AppState, body: &[u8]) -> Result<Response, RelayError> {
    let messages = parse_request(body)?;
    tracing::debug!(messages = messages.len(), "Relaying chat");

    let parts = state.chat().relay(messages).await?;
    let body = Body::from_stream(parts.map(Ok::<_, Infallible>));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (DATA_STREAM_HEADER, "v1"),
        ],
        body,
    )
        .into_response())
}
