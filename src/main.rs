use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use feedsift::config::Config;
use feedsift::feed::{FetchOptions, HttpFetcher};
use feedsift::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "feedsift", version, about = "Keyword filter proxy for RSS, Atom and JSON feeds")]
struct Args {
    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "feedsift.toml")]
    config: PathBuf,

    /// Port to listen on (overrides config file and PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind (overrides config file)
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedsift=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from '{}'", args.config.display()))?
        .apply_env()
        .context("Invalid environment override")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    let fetcher = HttpFetcher::new(FetchOptions::from(&config))
        .context("Failed to build HTTP client")?;
    let addr = format!("{}:{}", config.bind_address, config.port);
    let app = server::router(AppState::new(config, fetcher));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "feedsift listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, run until the process is killed
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
