//! Registry tag garbage collector daemon.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use rgc_core::config::AppConfig;
use rgc_server::scheduler::{spawn_cron_job, spawn_interval_job};
use rgc_server::{AppState, GcEngine, HttpRegistryClient, create_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ENV_PREFIX: &str = "RGC_";
const CONFIG_ENV: &str = "RGC_CONFIG";

/// rgcd - removes superseded tag digests from a registry's object store
#[derive(Parser, Debug)]
#[command(name = "rgcd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = CONFIG_ENV, default_value = "config/rgc.toml")]
    config: String,

    /// Run one full scan and cleanup pass, then exit
    #[arg(long)]
    once: bool,
}

/// Merge the optional TOML file with `RGC_` environment variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX) && key != CONFIG_ENV);

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: rgcd --config /path/to/rgc.toml\n  \
             2. Environment variables: RGC_REGISTRY__URL=https://registry.example.com \
             RGC_STORAGE__TYPE=s3 RGC_STORAGE__ENDPOINT=minio:9000 rgcd\n\n\
             See config/rgc.example.toml for example configuration.\n\
             Set RGC_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["CONFIG"]).split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("rgcd v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    rgc_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let storage = rgc_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!(backend = storage.backend_name(), "Storage backend connectivity verified");

    let registry = HttpRegistryClient::new(&config.registry).context("invalid registry config")?;
    tracing::info!(url = %registry.base_url(), "Registry client initialized");

    let engine = Arc::new(GcEngine::new(
        storage.clone(),
        Arc::new(registry),
        &config.gc,
    ));
    if config.gc.dry_run {
        tracing::warn!("Dry run: stale digests are reported but not removed");
    }
    engine.reseed();

    if args.once {
        let summary = engine.run_pass().await;
        tracing::info!(summary = ?summary, "One-shot pass finished");
        return Ok(());
    }

    let schedule = config.gc.reseed_schedule()?;
    let reseed_engine = engine.clone();
    spawn_cron_job("reseed", schedule, move || {
        let engine = reseed_engine.clone();
        async move {
            engine.reseed();
        }
    });

    let scan_engine = engine.clone();
    spawn_interval_job(
        "scan",
        config.gc.scan_interval(),
        config.gc.scan_max_instances,
        move || {
            let engine = scan_engine.clone();
            async move {
                engine.scan_one().await;
            }
        },
    );

    let cleanup_engine = engine.clone();
    spawn_interval_job(
        "cleanup",
        config.gc.cleanup_interval(),
        config.gc.cleanup_max_instances,
        move || {
            let engine = cleanup_engine.clone();
            async move {
                engine.cleanup_one().await;
            }
        },
    );
    tracing::info!(
        scan_interval_secs = config.gc.scan_interval_secs,
        cleanup_interval_secs = config.gc.cleanup_interval_secs,
        reseed_cron = %config.gc.reseed_cron,
        "GC scheduler started"
    );

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let app = create_router(AppState::new(config, storage, engine));

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
