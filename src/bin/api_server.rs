use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use flightheight::analysis::FlightHeightAnalyzer;
use flightheight::api::{create_router, AppState};
use flightheight::{Config, Result};

#[derive(Parser, Debug)]
#[command(author, version, about = "Flight height HTTP API", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    bind: String,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;
    let analyzer = FlightHeightAnalyzer::from_config(&config)?;
    let app = create_router(Arc::new(AppState::new(analyzer)));

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;

    tracing::info!(address = %args.bind, providers = config.providers.len(), "flight height API listening");
    tracing::info!("GET  /api/presets");
    tracing::info!("GET  /api/status");
    tracing::info!("POST /api/sessions/:id/images");
    tracing::info!("POST /api/sessions/:id/recalculate");
    tracing::info!("POST /api/sessions/:id/override");
    tracing::info!("GET  /api/sessions/:id");
    tracing::info!("POST /api/batch (multipart/form-data: csv)");

    axum::serve(listener, app).await?;
    Ok(())
}
