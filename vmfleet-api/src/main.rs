use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use vmfleet_api::{
    config::FleetConfig,
    inventory,
    logging::LoggingConfig,
    remote::HypervisorClient,
    routes,
    AppState,
};

/// Management API for a fleet of virtualization hosts
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,

    /// Host inventory file, overriding the configuration
    #[arg(short, long)]
    inventory: Option<PathBuf>,

    /// Print a sample configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", FleetConfig::generate_sample());
        return Ok(());
    }

    // Load configuration
    let mut config = FleetConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(path) = cli.inventory {
        config.inventory.path = path;
    }
    config.validate()?;

    // Initialize tracing; the guard keeps the file writer alive
    let _log_guard = LoggingConfig::from(&config.logging)
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    info!("Configuration loaded successfully");

    let client = Arc::new(
        HypervisorClient::new(config.remote.timeout()).context("Failed to build hypervisor client")?,
    );

    let registry = inventory::seed_registry(
        &config.inventory.path,
        config.inventory.refresh_on_start,
        client.as_ref(),
    )
    .await
    .context("Failed to load host inventory")?;

    let stats = registry.stats().await;
    info!("Registry seeded with {} host(s) and {} VM(s)", stats.hosts, stats.vms);

    let state = AppState::new(registry, client);

    // Set up graceful shutdown; /health reports draining once it starts
    let shutdown = state.shutdown.clone();
    let signals = shutdown.clone();
    let app = routes::router(state);
    tokio::spawn(async move { signals.wait_for_signal().await });

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("vmfleet API listening on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.signal())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server stopped");
    Ok(())
}
