//! spindled
//!
//! Demo daemon: seeds an in-memory store with a few jobs, registers the
//! reference job types and keeps them running until Ctrl-C (or until
//! `--run-for` elapses), then stops every job.

use anyhow::{Context, Result};
use clap::Parser;
use spindle_core::{FactoryRegistry, JobDefinition};
use spindle_spawner::{InMemoryJobStore, Spawner, SpawnerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "spindled")]
#[command(about = "Runs the spindle job spawner with demo jobs", long_about = None)]
struct Args {
    /// Number of heartbeat jobs to seed the store with
    #[arg(long, env = "SPINDLE_DEMO_JOBS", default_value_t = 2)]
    demo_jobs: usize,

    /// Heartbeat interval of the seeded jobs, in milliseconds
    #[arg(long, env = "SPINDLE_DEMO_INTERVAL_MS", default_value_t = 1000)]
    interval_ms: u64,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    run_for: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spindle_spawner=info,spindle_services=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config()?;
    info!(
        "Loaded configuration: command_buffer={}, max_parallel_loads={}, duplicate_policy={}",
        config.command_buffer, config.max_parallel_loads, config.duplicate_policy
    );

    let store = Arc::new(seed_store(args.demo_jobs, args.interval_ms));
    if store.is_empty() {
        warn!("Store is empty, no jobs will run until added");
    } else {
        info!("Seeded store with {} job(s)", store.len());
    }

    let mut factories = FactoryRegistry::new();
    spindle_services::register_job_types(&mut factories);
    info!("Registered job types: {}", factories.job_types().join(", "));

    let spawner = Spawner::new(config, store, factories);
    spawner.start().await.context("Failed to start spawner")?;

    let active = spawner.active_jobs().await?;
    info!("{} job(s) running", active.len());

    match args.run_for {
        Some(secs) => {
            info!("Running for {}s", secs);
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
        None => {
            info!("Press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
        }
    }

    spawner.stop().await;
    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<SpawnerConfig> {
    match SpawnerConfig::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            warn!("Failed to load config from environment ({:#}), using defaults", e);
            let config = SpawnerConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn seed_store(heartbeats: usize, interval_ms: u64) -> InMemoryJobStore {
    let store = InMemoryJobStore::new();

    store.insert(Arc::new(
        JobDefinition::new(spindle_services::echo::JOB_TYPE)
            .with_parameter("message", serde_json::json!("spindled is up")),
    ));

    for _ in 0..heartbeats {
        store.insert(Arc::new(
            JobDefinition::new(spindle_services::heartbeat::JOB_TYPE)
                .with_parameter("interval_ms", serde_json::json!(interval_ms)),
        ));
    }

    store
}
