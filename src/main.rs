use anyhow::Context;
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use signup_rs::{create_app, init_observability, shutdown_observability, AppContext, Config, Metrics};

#[derive(Debug, Parser)]
#[command(name = "signup-rs", version, about = "Signup form service")]
struct Cli {
    /// Path to the config file containing application settings. Cannot be
    /// used if the APP_CONFIG environment variable is set instead
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration first (basic logging only)
    let config = Config::load(cli.config).context("Failed to load configuration")?;

    init_observability(&config.observability).context("Failed to initialize observability")?;

    info!("Starting signup-rs service");
    info!(
        "Service: {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!(
        "Storage: region={}, table={}, key={}",
        config.storage.dynamodb_region,
        config.storage.signups_table,
        config.storage.key_attribute
    );

    let metrics = Arc::new(Metrics::new()?);
    info!("Metrics initialized successfully");

    let context = AppContext::from_config(&config, metrics.clone()).await;
    let app = create_app(context, metrics);

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let addr = listener.local_addr()?;
    info!("Server listening on {}", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
        shutdown_observability().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
