//! ticker
//!
//! Simulated trailer level and water tank feeds. Each runs as its own task
//! on a fixed period, first firing one period after start, and only does
//! work while at least one dashboard is connected.

pub mod simulation;

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info};

use crate::config::TickerSettings;
use crate::hub::Hub;
use crate::persistence::{Collection, Store, TRAILER_LEVEL, WATER};
use crate::utils::error::StoreError;

pub use simulation::{Step, step_level, step_water};

type StepFn = fn(&Collection, &Hub, &mut StdRng) -> Result<Step, StoreError>;

/// Spawn both tickers. The handles are only needed to abort them.
pub fn spawn_all(
    settings: &TickerSettings,
    store: &Store,
    hub: Arc<Hub>,
) -> Result<Vec<JoinHandle<()>>, StoreError> {
    let level = spawn(
        "level",
        store.collection(TRAILER_LEVEL)?,
        hub.clone(),
        Duration::from_millis(settings.level_interval_ms),
        step_level,
    );
    let water = spawn(
        "water",
        store.collection(WATER)?,
        hub,
        Duration::from_millis(settings.water_interval_ms),
        step_water,
    );
    Ok(vec![level, water])
}

fn spawn(
    name: &'static str,
    collection: Collection,
    hub: Arc<Hub>,
    period: Duration,
    step: StepFn,
) -> JoinHandle<()> {
    // interval_at panics on a zero period
    let period = period.max(Duration::from_millis(1));
    info!(ticker = name, period = ?period, "Starting simulation ticker");
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut rng = StdRng::from_entropy();

        loop {
            interval.tick().await;
            if let Err(e) = step(&collection, &hub, &mut rng) {
                error!(ticker = name, error = %e, "Simulation cycle failed");
            }
        }
    })
}
