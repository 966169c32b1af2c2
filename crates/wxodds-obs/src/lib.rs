use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,wxodds=debug";

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, for production log collectors
    Json,
    /// Human-readable lines for local development
    Pretty,
}

/// Initialize logging/tracing.
/// - RUST_LOG respected; default to "info,wxodds=debug"
pub fn init(service_name: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with((format == LogFormat::Json).then(|| fmt::layer().json()))
        .with((format == LogFormat::Pretty).then(|| fmt::layer()))
        .init();

    tracing::info!(service = %service_name, ?format, "Observability initialized");
}
