//! StemDeck Player (stemdeck-player) - Main entry point
//!
//! Loads the configured stems, then serves the transport over HTTP until
//! Ctrl+C / SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use stemdeck_common::config::TomlConfig;
use stemdeck_common::EventBus;
use stemdeck_player::api::{self, AppContext};
use stemdeck_player::audio::CpalGraph;
use stemdeck_player::config::PlayerConfig;
use stemdeck_player::engine::{BundleResolver, SystemClock, Transport};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for stemdeck-player
#[derive(Parser, Debug)]
#[command(name = "stemdeck-player")]
#[command(about = "Synchronized multi-track stem player")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "STEMDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory containing the stem files
    #[arg(short, long)]
    asset_root: Option<PathBuf>,

    /// Output device name
    #[arg(long)]
    output_device: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Do not load the configured manifest at startup
    #[arg(long)]
    no_autoload: bool,
}

fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "stemdeck_player={level},stemdeck_common={level},tower_http=info"
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins outright; otherwise the level is refined once the
    // configuration is resolved.
    let rust_log = EnvFilter::try_from_default_env().ok();
    let user_filter = rust_log.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(rust_log.unwrap_or_else(|| log_filter("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Priority: CLI > environment > TOML > defaults
    let mut toml_config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    toml_config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    if let Some(port) = args.port {
        toml_config.port = port;
    }
    if let Some(root) = args.asset_root {
        toml_config.asset_root = root;
    }
    if let Some(device) = args.output_device {
        toml_config.audio.output_device = Some(device);
    }
    if let Some(level) = args.log_level {
        toml_config.logging.level = level;
    }
    toml_config.validate().context("Invalid configuration")?;

    if !user_filter {
        if let Err(e) = filter_handle.reload(log_filter(&toml_config.logging.level)) {
            warn!("Failed to apply log level '{}': {}", toml_config.logging.level, e);
        }
    }

    let config = PlayerConfig::from_toml(&toml_config).context("Invalid engine configuration")?;

    info!(
        "Starting StemDeck Player v{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );
    info!("Asset root: {}", config.asset_root.display());

    let events = EventBus::new(100);
    let graph = CpalGraph::new(
        config.sample_rate,
        config.output_device.clone(),
        config.buffer_size,
    );
    let transport = Transport::new(
        Box::new(graph),
        Box::new(BundleResolver::new(config.asset_root.clone())),
        Arc::new(SystemClock),
        config.engine.clone(),
    )
    .with_event_bus(events.clone());

    let ctx = AppContext::new(
        transport,
        events,
        config.manifest.clone(),
        config.progress_interval,
    );

    if !args.no_autoload {
        let mut transport = Arc::clone(&ctx.transport).lock_owned().await;
        let manifest = config.manifest.clone();
        let loaded = tokio::task::spawn_blocking(move || transport.load(&manifest))
            .await
            .context("Load task failed")?;
        match loaded {
            Ok(()) => info!("Loaded {} stems", config.manifest.len()),
            // The API can retry the load
            Err(e) => error!("Initial load failed: {}", e),
        }
    }

    api::run(ctx.clone(), config.port, shutdown_signal())
        .await
        .context("Server error")?;

    ctx.transport.lock().await.shutdown();
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
