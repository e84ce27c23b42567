//! # fermhubd — fermhub daemon
//!
//! Composition root that wires the adapters together and runs the chamber
//! manager until interrupted.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the repository and device configurator (adapters)
//! - Construct the chamber manager, injecting adapters via port traits
//! - Handle graceful shutdown (SIGINT): every actuator is switched off before exit
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::time::Duration;

use fermhub_adapter_storage_sqlite_sqlx::SqliteChamberRepository;
use fermhub_adapter_virtual::VirtualConfigurator;
use fermhub_app::services::chamber_manager::ChamberManager;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = fermhub_adapter_storage_sqlite_sqlx::Config {
        busy_timeout: Duration::from_secs(config.database.busy_timeout_secs),
        ..fermhub_adapter_storage_sqlite_sqlx::Config::new(config.database_url())
    }
    .build()
    .await?;
    let repo = SqliteChamberRepository::new(db.pool().clone());

    // Devices
    let configurator = VirtualConfigurator::new();

    // Chambers
    let (manager, report) = ChamberManager::new(repo, configurator, config.control).await?;
    for failure in &report.failures {
        for problem in failure.error.problems() {
            tracing::warn!(
                chamber_id = %failure.chamber_id,
                chamber = %failure.chamber_name,
                %problem,
                "device configuration problem"
            );
        }
    }
    tracing::info!(chambers = report.loaded, "fermhubd running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    manager.shutdown().await;
    db.close().await;

    Ok(())
}
