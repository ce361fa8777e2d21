//! Engine binary for the Hustings campaign simulator.
//!
//! This is the main entry point that wires together the simulation core,
//! the `PostgreSQL` persistence layer, and the Observer API server. It
//! loads configuration, builds the simulation, and runs the tick loop
//! until a termination condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `hustings-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the state baseline table
//! 4. Build the simulation (seeded RNG, startup broadcast)
//! 5. Connect to `PostgreSQL` and run migrations (skipped with a warning
//!    when the database is unreachable)
//! 6. Start the Observer API server sharing the simulation lock
//! 7. Run the tick loop until `Ctrl-C` or the configured tick bound

mod error;
mod persist;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hustings_core::baseline::BaselineTable;
use hustings_core::config::HustingsConfig;
use hustings_core::simulation::Simulation;
use hustings_db::PostgresPool;
use hustings_observer::{start_server, AppState, ServerConfig, TickBroadcast};
use hustings_types::CampaignCycle;

use crate::error::EngineError;
use crate::persist::TickPersister;

/// Application entry point for the engine.
///
/// Initializes all subsystems and runs the tick loop. Returns an error
/// code on failure.
///
/// # Errors
///
/// Returns an error if any initialization step fails or a tick hits a
/// clock-level failure.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_from_file) = load_config()?;

    // 2. Structured logging; RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("hustings-engine starting");
    info!(
        from_file = config_from_file,
        world_name = config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        step_hours = config.world.step_hours,
        "Configuration loaded"
    );

    // 3. Load the state baseline table.
    let baseline = BaselineTable::from_file(Path::new(&config.election.baseline_path))?;
    info!(
        states = baseline.len(),
        electors = baseline.total_electors(),
        "State baseline loaded"
    );

    // 4. Build the simulation.
    let simulation = Simulation::new(config.clone(), baseline).map_err(EngineError::from)?;
    let sim = Arc::new(RwLock::new(simulation));
    info!("Simulation initialized");

    // 5. Connect to PostgreSQL. An unreachable database downgrades to an
    //    in-memory run rather than refusing to start.
    let mut persister = match PostgresPool::connect_url(&config.infrastructure.postgres_url).await
    {
        Ok(pool) => {
            pool.run_migrations().await.map_err(EngineError::from)?;
            Some(TickPersister::new(pool))
        }
        Err(e) => {
            warn!(error = %e, "PostgreSQL unavailable, running without persistence");
            None
        }
    };

    // 6. Start the Observer API server.
    let app_state = Arc::new(AppState::new(Arc::clone(&sim)));
    let server_config = ServerConfig {
        host: config.infrastructure.observer_host.clone(),
        port: config.infrastructure.observer_port,
    };
    {
        let observer_state = Arc::clone(&app_state);
        tokio::spawn(async move {
            if let Err(e) = start_server(&server_config, observer_state).await {
                tracing::error!(error = %e, "Observer server exited");
            }
        });
    }
    info!(
        host = config.infrastructure.observer_host,
        port = config.infrastructure.observer_port,
        "Observer API server started"
    );

    // 7. Tick loop.
    let mut interval = tokio::time::interval(Duration::from_millis(config.world.tick_interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let max_ticks = config.simulation.max_ticks;
    let mut ticks: u64 = 0;

    info!(max_ticks, "Entering tick loop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            _ = interval.tick() => {
                let report = {
                    let mut guard = sim.write().await;
                    guard.run_tick()
                };
                let report = match report {
                    Ok(report) => report,
                    Err(e) => {
                        tracing::error!(error = %e, "tick failed, shutting down");
                        break;
                    }
                };

                if let Some(persister) = persister.as_mut() {
                    let cycles: Vec<CampaignCycle> = {
                        let guard = sim.read().await;
                        guard.latest_cycles().cloned().collect()
                    };
                    if let Err(e) = persister.persist(&report, &cycles).await {
                        warn!(error = %e, "persist step failed, continuing");
                    }
                }

                app_state.broadcast(&TickBroadcast::from(&report));

                ticks = ticks.saturating_add(1);
                if max_ticks != 0 && ticks >= max_ticks {
                    info!(ticks, "Configured tick bound reached, shutting down");
                    break;
                }
            }
        }
    }

    if let Some(persister) = persister {
        persister.into_pool().close().await;
    }
    info!(ticks, "hustings-engine shutdown complete");
    Ok(())
}

/// Load the main configuration from `hustings-config.yaml`, falling back
/// to defaults when the file does not exist. The second value reports
/// which path was taken, for the startup log.
fn load_config() -> Result<(HustingsConfig, bool), EngineError> {
    let config_path = Path::new("hustings-config.yaml");
    if config_path.exists() {
        Ok((HustingsConfig::from_file(config_path)?, true))
    } else {
        Ok((HustingsConfig::default(), false))
    }
}
