/// HTTP client for the upstream completions provider.
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;

use crate::chat::CompletionRequest;
use crate::config::{ServerConfig, UpstreamConfig};
use crate::error::RelayError;

fn build_http_client(server: &ServerConfig) -> Result<reqwest::Client, RelayError> {
    let pool_idle_timeout = if server.http_pool_idle_timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(server.http_pool_idle_timeout_secs))
    };

    reqwest::Client::builder()
        .pool_max_idle_per_host(server.http_pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(server.connect_timeout_secs))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|err| RelayError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// Streaming client for the completions endpoint.
///
/// One attempt per invocation: no retries, no backoff. An interactive,
/// user-visible request would duplicate cost and latency if retried here;
/// retry policy belongs to the caller.
pub struct UpstreamClient {
    http: reqwest::Client,
    completions_url: String,
    api_key: String,
}

impl UpstreamClient {
    /// Build a client with pooling and connect-timeout settings from server
    /// config. Note there is no overall request deadline; a hung upstream
    /// hangs the relay.
    #[must_use]
    pub fn new(server: &ServerConfig, upstream: &UpstreamConfig) -> Self {
        let http = match build_http_client(server) {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "failed to build configured HTTP client, falling back to default client");
                reqwest::Client::new()
            }
        };
        Self {
            http,
            completions_url: upstream.completions_url.clone(),
            api_key: upstream.api_key.clone(),
        }
    }

    /// Open a streaming completion request and return the live byte stream.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] when the request fails before a
    /// status is received, or [`RelayError::Upstream`] carrying the literal
    /// status for any non-200 response.
    pub async fn open_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static, RelayError> {
        let response = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .header(http::header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| RelayError::Transport(format!("upstream request failed: {err}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes_stream())
    }
}
