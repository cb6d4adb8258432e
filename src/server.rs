//! Process wiring for `rvdash server`
//!
//! `prepare` opens and seeds the store, starts the broker connection and the
//! simulation tickers, and returns a [`Server`] holding the shared state.
//! `serve` then runs the HTTP application on a listener until it fails.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::{self, AppState};
use crate::api::auth::ensure_admin;
use crate::bridge;
use crate::config::{ServerSettings, Settings};
use crate::hub::Hub;
use crate::persistence::{Store, seed};
use crate::ticker;
use crate::utils::error::ServerError;

pub struct Server {
    state: AppState,
    tasks: Vec<JoinHandle<()>>,
}

/// Must be called inside a tokio runtime; background tasks are spawned here.
pub fn prepare(settings: Settings) -> Result<Server, ServerError> {
    let store = Store::open(&settings.storage.db_path)?;
    seed(&store)?;
    ensure_admin(&store, settings.server.admin_password.as_deref())?;

    if let Err(e) = std::fs::create_dir_all(&settings.storage.deployment_dir) {
        warn!(
            path = %settings.storage.deployment_dir,
            error = %e,
            "Deployment directory unavailable; uploads will fail"
        );
    }

    let hub = Arc::new(Hub::new());
    let (bridge, event_loop) = bridge::start(&settings.mqtt, hub.clone())?;

    let mut tasks = vec![event_loop];
    tasks.extend(ticker::spawn_all(&settings.ticker, &store, hub.clone())?);

    Ok(Server {
        state: AppState::new(store, hub, bridge, settings),
        tasks,
    })
}

pub async fn bind(settings: &ServerSettings) -> Result<TcpListener, ServerError> {
    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Listening");
    Ok(listener)
}

impl Server {
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        axum::serve(listener, api::router(self.state.clone())).await?;
        Ok(())
    }

    /// Stop background tasks, drop the broker session and flush the store.
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
        self.state.bridge.disconnect();
        if let Err(e) = self.state.store.flush() {
            error!(error = %e, "Failed to flush document store");
        }
    }
}
