//! ww-market - WasteWise marketplace service
//!
//! Serves the device collection and recycled parts marketplace over HTTP,
//! a live SSE feed of marketplace events, and image classification backed
//! by a hosted model.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ww_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use ww_common::events::EventBus;

use ww_market::api::buildinfo::BuildInfo;
use ww_market::classify::GeminiClassifier;
use ww_market::config::{self, MODULE_NAME};
use ww_market::AppState;

/// Command-line arguments for ww-market
#[derive(Parser, Debug)]
#[command(name = "ww-market")]
#[command(about = "WasteWise e-waste marketplace service")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, env = "WW_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "WW_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "WW_PORT")]
    port: Option<u16>,

    /// Gemini API key for image classification
    #[arg(long, env = "WW_GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, env = "WW_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default(MODULE_NAME);

    let default_filter = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let build = BuildInfo::current();
    info!(
        "Starting {} v{} [{}] built {} ({})",
        MODULE_NAME, build.version, build.git_hash, build.build_timestamp, build.build_profile
    );

    // Root folder and database
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml(toml_config.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = ww_market::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let (fees, payee) = config::marketplace_settings(&toml_config.marketplace)
        .context("Invalid [marketplace] configuration")?;
    info!(
        collection_payment = fees.collection_payment,
        service_fee = fees.service_fee,
        currency = %payee.currency,
        "Marketplace fees"
    );

    let event_bus = EventBus::new(100);
    let mut state = AppState::new(db_pool, event_bus, fees, payee);

    let api_key = config::resolve_gemini_api_key(args.gemini_api_key.as_deref(), &toml_config);
    if api_key.is_some() {
        match GeminiClassifier::new(&config::classifier_config(api_key, &toml_config)) {
            Ok(classifier) => {
                info!(model = %toml_config.classifier.model, "Image classification enabled");
                state = state.with_classifier(Arc::new(classifier));
            }
            Err(e) => warn!("Image classification disabled: {}", e),
        }
    }

    let app = ww_market::build_router(state);

    let (bind, port) = config::resolve_listen_address(args.bind, args.port, &toml_config);
    let addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
