use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::{health, message};
use crate::state::AppState;

enum RouteMatch {
    Health,
    Message,
    MethodNotAllowed,
    NotFound,
}

/// Dispatch a raw HTTP request to the matching handler.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, request_body) = request.into_parts();
    let route = match_route(&parts.method, parts.uri.path());

    let response = match route {
        RouteMatch::Health => health::health_handler(State(state)).into_response(),
        RouteMatch::Message => {
            let limit = state.config.server.body_limit_bytes;
            let body_bytes = match read_request_body(request_body, limit).await {
                Ok(bytes) => bytes,
                Err(response) => return Ok(response),
            };
            message::handler(State(state), parts.headers, body_bytes).await
        }
        RouteMatch::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        RouteMatch::NotFound => StatusCode::NOT_FOUND.into_response(),
    };

    Ok(response)
}

async fn read_request_body(request_body: Body, limit: usize) -> Result<bytes::Bytes, Response> {
    body::to_bytes(request_body, limit)
        .await
        .map_err(|_| (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response())
}

fn match_route(method: &Method, path: &str) -> RouteMatch {
    match path {
        "/" => {
            if method == Method::GET {
                RouteMatch::Health
            } else {
                RouteMatch::MethodNotAllowed
            }
        }
        "/api/message" => {
            if method == Method::POST {
                RouteMatch::Message
            } else {
                RouteMatch::MethodNotAllowed
            }
        }
        _ => RouteMatch::NotFound,
    }
}
