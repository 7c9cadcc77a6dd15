use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::chat::{self, MessagePayload};
use crate::config::ServerConfig;
use crate::error::{user_message, RelayError};
use crate::state::AppState;
use crate::stream::relay_stream;

/// `POST /api/message`: validate the widget payload, assemble the upstream
/// request, and relay the completion stream back as a chunked response.
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: http::HeaderMap,
    body: bytes::Bytes,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    match handle_message(&state, &headers, &body, request_id).await {
        Ok(response) => response,
        Err(err) => {
            // Internal detail stays in the log; the body carries only the
            // status-mapped user-safe message.
            tracing::warn!(%request_id, error = %err, "message request failed");
            err.into_response()
        }
    }
}

async fn handle_message(
    state: &AppState,
    headers: &http::HeaderMap,
    body: &[u8],
    request_id: uuid::Uuid,
) -> Result<Response, RelayError> {
    let payload: MessagePayload = serde_json::from_slice(body)
        .map_err(|err| RelayError::Validation(format!("malformed message payload: {err}")))?;

    let caller = caller_key(&state.config.server, headers);
    if !state.rate_limiter.check(caller) {
        tracing::info!(%request_id, caller, "caller over rate limit");
        let status = http::StatusCode::TOO_MANY_REQUESTS;
        return Ok((status, user_message(status)).into_response());
    }

    let completion = chat::build_completion_request(&payload.messages, &state.config.chat);
    let upstream_bytes = state.upstream.open_stream(&completion).await?;
    tracing::info!(
        %request_id,
        caller,
        model = %completion.model,
        messages = payload.messages.len(),
        "relaying completion stream"
    );

    let mut response = Response::new(Body::from_stream(relay_stream(upstream_bytes)));
    *response.status_mut() = http::StatusCode::OK;
    let response_headers = response.headers_mut();
    response_headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response_headers.insert(
        http::header::TRANSFER_ENCODING,
        http::HeaderValue::from_static("chunked"),
    );
    Ok(response)
}

/// Identity key for rate limiting. The first forwarded-for hop when the
/// deployment says those headers are trustworthy, otherwise a single shared
/// bucket.
fn caller_key<'a>(server: &ServerConfig, headers: &'a http::HeaderMap) -> &'a str {
    if server.trust_forwarded_headers {
        if let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
        {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first;
                }
            }
        }
    }
    "anonymous"
}
