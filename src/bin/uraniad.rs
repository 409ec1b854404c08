//! uraniad — Urania daemon.
//!
//! Serves the [`InterpretationGateway`](urania::InterpretationGateway)
//! over HTTP so the chart UI shares one cache and one set of admission
//! windows.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use urania::server::config::{Config, Secrets};
use urania::server::{AppState, router};
use urania::{HttpInterpretationProvider, Urania, UraniaError};

/// Urania daemon — interpretation cache and admission-control service.
#[derive(Parser)]
#[command(name = "uraniad")]
#[command(version = urania::PKG_VERSION)]
#[command(about = "Urania interpretation gateway daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let gateway = Arc::new(build_gateway(&config, &secrets)?);

    // Old admission windows accumulate one map entry per (identity, tier);
    // reclaim them periodically.
    let limiter_gateway = Arc::clone(&gateway);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(600));
        loop {
            ticker.tick().await;
            limiter_gateway
                .limiter()
                .purge_expired(Duration::from_secs(3600))
                .await;
        }
    });

    let addr = config.server.address.clone();
    info!(version = urania::version_string(), %addr, "uraniad starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(AppState { gateway })).await?;

    Ok(())
}

/// Build an [`InterpretationGateway`](urania::InterpretationGateway) from configuration.
fn build_gateway(
    config: &Config,
    secrets: &Secrets,
) -> Result<urania::InterpretationGateway, UraniaError> {
    let api_key = secrets.api_key().ok_or_else(|| {
        UraniaError::Configuration(
            "No provider API key. Set URANIA_API_KEY or add it to secrets.toml".to_string(),
        )
    })?;

    let provider = HttpInterpretationProvider::with_timeout(
        &config.provider.base_url,
        api_key,
        &config.provider.model,
        Duration::from_secs(config.provider.timeout_secs),
    );

    Urania::builder()
        .cache(config.cache_config())
        .limits(config.limiter_config())
        .retry(config.retry_config())
        .provider(Arc::new(provider))
        .build()
}
