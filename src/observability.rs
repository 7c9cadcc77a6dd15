use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber from the configured log level.
///
/// `DISABLED` installs nothing; `WARNING` and `CRITICAL` are accepted as
/// aliases for WARN and ERROR so config files can use either vocabulary.
pub fn init_tracing(log_level: &str) {
    let level = log_level.to_uppercase();
    let directive = match level.as_str() {
        "DISABLED" => return,
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };

    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("INFO"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
