use crate::config::AppConfig;
use crate::rate_limit::SlidingWindowLimiter;
use crate::transport::UpstreamClient;

/// Shared application state accessible to all handlers.
///
/// Collaborators are injected here rather than reached as ambient
/// singletons, so tests can substitute fakes.
pub struct AppState {
    pub config: AppConfig,
    pub upstream: UpstreamClient,
    pub rate_limiter: SlidingWindowLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        upstream: UpstreamClient,
        rate_limiter: SlidingWindowLimiter,
    ) -> Self {
        Self {
            config,
            upstream,
            rate_limiter,
        }
    }
}
