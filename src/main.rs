use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stonklytics_api::{app, AppConfig, AppState};

#[derive(Parser)]
#[command(name = "stonklytics-api")]
#[command(about = "Stonklytics API - watchlists, market data and AI stock summaries")]
#[command(version)]
struct Args {
    #[arg(long, help = "Address to bind (overrides STONK_API_HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides STONK_API_PORT / PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, OPENAI_API_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!("Starting Stonklytics API in {:?} mode", config.environment);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config).context("failed to initialize application state")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Stonklytics API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
