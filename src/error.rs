/// Canonical error type used across all modules.
///
/// Every variant is terminal to the request that raised it; nothing here is
/// retried internally. Internal detail (upstream bodies, parse positions) is
/// carried for logging and never reaches the response body.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Decode error: {0}")]
    Decode(String),
}

impl RelayError {
    /// HTTP status returned to the widget for this failure.
    ///
    /// Upstream failures propagate their literal status so the caller can
    /// tell a retry-worthy 429/5xx from a permanent 4xx; everything local
    /// collapses to 400 (bad payload) or 500.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            RelayError::Validation(_) => http::StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => http::StatusCode::from_u16(*status)
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR),
            RelayError::Config(_) | RelayError::Transport(_) | RelayError::Decode(_) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// User-safe response body for a given status.
///
/// The widget renders these verbatim (markdown links included), so they must
/// never contain upstream detail.
#[must_use]
pub fn user_message(status: http::StatusCode) -> &'static str {
    match status {
        http::StatusCode::TOO_MANY_REQUESTS => "Slow down, huh? Got it. \u{1f40c}",
        http::StatusCode::UNAUTHORIZED => {
            "The chat service is not configured with a valid access key."
        }
        _ => "Something went wrong",
    }
}

impl axum::response::IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (status, user_message(status)).into_response()
    }
}
