//! api
//!
//! The REST surface served next to `/ws`. Every route under `/api` except
//! `/api/health` and `/api/auth/*` sits behind [`auth::require_auth`].

pub mod auth;
pub mod deployments;
pub mod lights;
pub mod settings;
pub mod telemetry;
pub mod thermostat;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::middleware;
use axum::routing::{delete, get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::bridge::Bridge;
use crate::config::Settings;
use crate::hub::Hub;
use crate::persistence::Store;
use crate::transport;

/// Largest accepted deployment upload.
pub const UPLOAD_LIMIT: usize = 2 * 1024 * 1024 * 1024;

/// Shared handles every handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub hub: Arc<Hub>,
    pub bridge: Arc<Bridge>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Store, hub: Arc<Hub>, bridge: Arc<Bridge>, settings: Settings) -> Self {
        Self {
            store,
            hub,
            bridge,
            settings: Arc::new(settings),
        }
    }

    pub fn deployment_dir(&self) -> PathBuf {
        PathBuf::from(&self.settings.storage.deployment_dir)
    }
}

impl FromRef<AppState> for Arc<Hub> {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

/// Assemble the full HTTP application: REST routes, `/ws` and, when
/// configured, the static frontend for everything else.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(telemetry::health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/check", get(auth::check))
        .route("/api/auth/change-password", post(auth::change_password));

    let protected = Router::new()
        .route(
            "/api/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/api/level", get(telemetry::level))
        .route("/api/water", get(telemetry::water))
        .route("/api/lights", get(lights::list))
        .route("/api/lights/:id", put(lights::update))
        .route(
            "/api/thermostat",
            get(telemetry::thermostat).put(thermostat::command),
        )
        .route("/api/energy", get(telemetry::energy))
        .route("/api/airquality", get(telemetry::air_quality))
        .route("/api/deployments", get(deployments::list))
        .route(
            "/api/deployments/upload",
            post(deployments::upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/api/deployments/:id", delete(deployments::remove))
        .route(
            "/api/deployment-download/latest/info",
            get(deployments::latest_info),
        )
        .route("/api/deployment-download/:id", get(deployments::download))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let mut app = Router::new()
        .merge(public)
        .merge(protected)
        .merge(transport::routes());

    if let Some(dir) = &state.settings.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests;
