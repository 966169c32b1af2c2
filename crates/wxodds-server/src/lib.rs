use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Deserialize;
use wxodds_core::{DaySpecifier, PredictionError, PredictionResult, PredictionService};
use wxodds_obs::LogFormat;

const INDEX_HTML: &str = include_str!("../static/index.html");
const MAIN_JS: &str = include_str!("../static/main.js");

pub struct AppState {
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    fetch_failures_total: Counter<u64>,
    service: PredictionService,
}

pub fn build_app(service: PredictionService) -> Result<Router> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("wxodds");

    let requests_total = meter
        .u64_counter("wxodds_requests_total")
        .with_description("Total prediction requests served")
        .init();
    let fetch_failures_total = meter
        .u64_counter("wxodds_fetch_failures_total")
        .with_description("Prediction requests that failed upstream")
        .init();

    let state = Arc::new(AppState {
        registry,
        provider,
        requests_total,
        fetch_failures_total,
        service,
    });

    let router = Router::new()
        .route("/", get(home_page))
        .route("/static/main.js", get(main_js))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/data", get(data))
        .with_state(state);

    Ok(router)
}

async fn home_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn main_js() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/javascript; charset=utf-8"),
        )],
        MAIN_JS,
    )
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<Arc<AppState>>) -> ([(HeaderName, HeaderValue); 1], String) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

/// Error body returned as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    Upstream(String),
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            PredictionError::Fetch(e) => ApiError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(msg) => {
                tracing::error!(error = %msg, "prediction failed upstream");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error fetching data: {msg}"),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct DataQuery {
    #[serde(rename = "unix-time")]
    unix_time: Option<String>,
    #[serde(rename = "day-of-year")]
    day_of_year: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
}

fn parse_param<T: FromStr>(value: Option<&str>, name: &str) -> Result<T, ApiError> {
    let raw = value.ok_or_else(|| ApiError::InvalidInput(format!("missing {name} parameter")))?;
    raw.trim()
        .parse()
        .map_err(|_| ApiError::InvalidInput(format!("invalid {name} parameter: {raw:?}")))
}

async fn data(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DataQuery>,
) -> Result<Json<PredictionResult>, ApiError> {
    state.requests_total.add(1, &[]);

    let day = match (q.unix_time.as_deref(), q.day_of_year.as_deref()) {
        (Some(_), Some(_)) => {
            return Err(ApiError::InvalidInput(
                "pass either unix-time or day-of-year, not both".to_string(),
            ))
        }
        (Some(t), None) => DaySpecifier::UnixTime(parse_param(Some(t), "unix-time")?),
        (None, Some(d)) => DaySpecifier::DayOfYear(parse_param(Some(d), "day-of-year")?),
        (None, None) => {
            return Err(ApiError::InvalidInput(
                "missing unix-time parameter".to_string(),
            ))
        }
    };
    let latitude: f64 = parse_param(q.latitude.as_deref(), "latitude")?;
    let longitude: f64 = parse_param(q.longitude.as_deref(), "longitude")?;

    match state.service.predict(day, latitude, longitude).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            if matches!(e, PredictionError::Fetch(_)) {
                state.fetch_failures_total.add(1, &[]);
            }
            Err(e.into())
        }
    }
}

/// How the binary was asked to serve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeMode {
    /// Local server on the configured development address
    Development,
    /// Server bound to an explicit host and port
    Production { host: String, port: u16 },
}

impl ServeMode {
    pub fn log_format(&self) -> LogFormat {
        match self {
            ServeMode::Development => LogFormat::Pretty,
            ServeMode::Production { .. } => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CliError {
    #[error("Invalid number of arguments. Usage for production: wxodds <host> <port>")]
    Usage,
    #[error("Port must be an integer.")]
    InvalidPort,
}

/// Select the serving mode from the arguments after the program name
pub fn parse_mode(args: &[String]) -> Result<ServeMode, CliError> {
    match args {
        [] => Ok(ServeMode::Development),
        [host, port] => {
            let port = port.parse().map_err(|_| CliError::InvalidPort)?;
            Ok(ServeMode::Production {
                host: host.clone(),
                port,
            })
        }
        _ => Err(CliError::Usage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_is_development() {
        let mode = parse_mode(&[]).unwrap();
        assert_eq!(mode, ServeMode::Development);
        assert_eq!(mode.log_format(), LogFormat::Pretty);
    }

    #[test]
    fn host_and_port_is_production() {
        let mode = parse_mode(&args(&["0.0.0.0", "8080"])).unwrap();
        assert_eq!(
            mode,
            ServeMode::Production {
                host: "0.0.0.0".to_string(),
                port: 8080
            }
        );
        assert_eq!(mode.log_format(), LogFormat::Json);
    }

    #[test]
    fn wrong_argument_count_is_usage_error() {
        assert_eq!(parse_mode(&args(&["0.0.0.0"])), Err(CliError::Usage));
        assert_eq!(
            parse_mode(&args(&["0.0.0.0", "8080", "extra"])),
            Err(CliError::Usage)
        );
    }

    #[test]
    fn malformed_port_is_rejected() {
        assert_eq!(
            parse_mode(&args(&["0.0.0.0", "http"])),
            Err(CliError::InvalidPort)
        );
        assert_eq!(
            parse_mode(&args(&["0.0.0.0", "70000"])),
            Err(CliError::InvalidPort)
        );
        assert_eq!(
            CliError::InvalidPort.to_string(),
            "Port must be an integer."
        );
    }
}
