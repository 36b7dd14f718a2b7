//! Volume tile server.
//!
//! HTTP server rendering tiles of registered multi-view volume acquisitions.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use tile_server::config::{max_blocking_threads, ServerArgs, ServerConfig};
use tile_server::dataset::Dataset;
use tile_server::state::AppState;

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = ServerArgs::parse();

    // Build tokio runtime with configurable worker threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }
    runtime_builder.max_blocking_threads(max_blocking_threads(args.workers));

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))?;
    Ok(())
}

async fn async_main(args: ServerArgs) -> Result<()> {
    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    info!("Prometheus metrics exporter initialized");

    let config = ServerConfig::from_args(&args)?;
    info!(config = ?config, "Starting tile server");

    let dataset = match &config.dataset {
        Some(path) => Dataset::load(path)?,
        None => {
            info!("No dataset configured, serving the synthetic demo dataset");
            Dataset::demo()?
        }
    };

    let listen = config.listen;
    let state = Arc::new(AppState::new(config, &dataset).context("failed to create renderer workers")?);
    let shutdown_state = Arc::clone(&state);

    let app = tile_server::build_router(state, prometheus_handle);

    info!(address = %listen, "Listening");

    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Cannot listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested, closing worker pool");
            shutdown_state.shutdown();
        })
        .await?;

    Ok(())
}
