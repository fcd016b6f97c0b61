//! Faucet service binary

use anyhow::Context;
use clap::Parser;
use faucet_common::utils::logging::init_logging;
use faucet_service::api::{router, RouterOptions};
use faucet_service::{FaucetConfig, FaucetService};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address
    #[arg(long)]
    server_addr: Option<String>,

    /// Upstream RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Private key
    #[arg(long, env = "FAUCET_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Rate limit window (seconds)
    #[arg(long)]
    rate_limit_window: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = FaucetConfig::load(args.config.as_deref())?;

    // Override with CLI arguments
    if let Some(addr) = args.server_addr {
        config.server_addr = addr;
    }
    if let Some(rpc_url) = args.rpc_url {
        config.rpc_url = rpc_url;
    }
    if let Some(key) = args.private_key {
        config.private_key = key;
    }
    if let Some(window) = args.rate_limit_window {
        config.rate_limit_window_secs = window;
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    }

    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!("Starting faucet v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Server address: {}", config.server_addr);
    info!("  RPC URL: {}", config.rpc_url);
    info!("  Dispense amount: {} wei", config.dispense_amount);
    info!("  Greed ceiling: {} wei", config.greed_ceiling);
    info!(
        "  Rate limit: {} requests / {}s",
        config.max_requests_per_window, config.rate_limit_window_secs
    );
    info!("  Abuse cache TTL: {}s", config.abuse_cache_ttl_secs);

    let service = Arc::new(FaucetService::from_config(&config).context("Failed to build faucet service")?);
    info!("Faucet service initialized");

    let app = router(service.clone(), RouterOptions::from(&config));

    let maintenance = service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            interval.tick().await;
            maintenance.run_maintenance().await;
        }
    });

    let addr: SocketAddr = config
        .server_addr
        .parse()
        .with_context(|| format!("Invalid server address {}", config.server_addr))?;
    info!("Listening on {}", addr);
    info!("Proxying to {}", config.rpc_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
