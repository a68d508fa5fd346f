//! voxflow - directory-watching segmentation task service.
//!
//! Watches a tasks directory for `.tsk` descriptor files, runs them against
//! the external segmentation engine, and archives each descriptor with a
//! result record. Ctrl-C drains in-flight tasks before exiting.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use voxflow_core::app::{Dispatcher, ServiceConfig, TaskRunner};
use voxflow_core::impls::{HttpSegmenter, JsonVolumeStore};
use voxflow_core::ports::{Segmenter, SystemClock};
use voxflow_core::store::DescriptorStore;

#[derive(Parser, Debug)]
#[command(name = "voxflow", version, about = "Volumetric segmentation task service")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Base directory relative task/archive directories are resolved under.
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Override the poll interval from the configuration, in seconds.
    #[arg(long)]
    interval: Option<u64>,

    /// Override the engine endpoint from the configuration.
    #[arg(long)]
    engine: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Starting voxflow v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ServiceConfig::load_or_default(&args.config);
    if let Some(base) = &args.base_dir {
        config = config.rooted_at(base);
    }
    if let Some(interval) = args.interval {
        config.poll_interval_secs = interval;
    }
    if let Some(engine) = args.engine {
        config.engine_endpoint = engine;
    }
    let config = Arc::new(config);

    let store = Arc::new(DescriptorStore::open(
        &config.tasks_directory,
        &config.archive_directory,
    )?);
    info!(
        tasks = %config.tasks_directory.display(),
        archive = %config.archive_directory.display(),
        engine = %config.engine_endpoint,
        "service configured"
    );

    let segmenter: Arc<dyn Segmenter> = Arc::new(HttpSegmenter::new(&config.engine_endpoint));
    let clock = Arc::new(SystemClock);
    let runner = Arc::new(TaskRunner::new(
        Arc::clone(&store),
        segmenter,
        Arc::new(JsonVolumeStore),
        Arc::clone(&clock) as _,
        Arc::clone(&config),
    ));
    let dispatcher = Dispatcher::new(store, runner, clock, config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
        let _ = shutdown_tx.send(true);
    });

    dispatcher.run(shutdown_rx).await;
    info!("voxflow stopped");
    Ok(())
}
