//! HTTP API server for Hearth gateway

pub mod auth;
pub mod health;
pub mod smarthome;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::directory::DeviceDirectory;
use crate::homegraph::HomeGraphClient;
use crate::store::StateStore;
use crate::upstream::DeviceApiClient;
use crate::Result;

/// Shared state for API handlers
pub struct ApiState {
    /// Device directory served at SYNC
    pub directory: DeviceDirectory,

    /// Realtime device state store
    pub store: StateStore,

    /// Platform client; `None` when no credential is configured
    pub homegraph: Option<HomeGraphClient>,

    /// Remote device service commands are forwarded to, when configured
    pub device_api: Option<DeviceApiClient>,

    /// Agent user id for SYNC responses and request-sync calls
    pub agent_user_id: String,
}

/// Build the full gateway router over the given state
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(auth::router())
        .merge(smarthome::router(state))
        .merge(health::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server over the given state
    #[must_use]
    pub fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
