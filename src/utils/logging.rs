use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the application.
///
/// `default_level` comes from configuration; `RUST_LOG` wins when it is set.
pub fn init(default_level: &str) {
    let level = match default_level.to_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // try_init so tests can call this repeatedly
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
