use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use wxodds_config::AppConfig;
use wxodds_core::PredictionService;
use wxodds_fetch::PowerClient;
use wxodds_server::ServeMode;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match wxodds_server::parse_mode(&args) {
        Ok(mode) => mode,
        Err(e) => {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Observability
    wxodds_obs::init("wxodds", mode.log_format());

    match run(mode).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(mode: ServeMode) -> Result<()> {
    // Config
    let cfg = AppConfig::load().context("failed to load configuration")?;
    let window = cfg.year_window()?;

    let client = PowerClient::new(cfg.provider.settings())
        .context("failed to build provider client")?;

    let service = PredictionService::new(Arc::new(client), window, cfg.history.granularity);
    let app = wxodds_server::build_app(service)?;

    let listener = match &mode {
        ServeMode::Development => TcpListener::bind(cfg.server.dev_bind.as_str()).await,
        ServeMode::Production { host, port } => TcpListener::bind((host.as_str(), *port)).await,
    }
    .context("failed to bind TCP listener")?;
    let addr: SocketAddr = listener.local_addr()?;

    tracing::info!(
        %addr,
        ?mode,
        start_year = window.start(),
        end_year = window.end(),
        "HTTP server listening"
    );
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
