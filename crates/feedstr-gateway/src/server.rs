// SPDX-FileCopyrightText: 2026 Feedstr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use feedstr_core::{FeedstrError, RecordLog};
use feedstr_engine::{ControllerHandle, PolicyGate};

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// What `/health` reports about the service.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub description: String,
    pub public_url: String,
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub controller: ControllerHandle,
    /// Read access to the record log for client queries.
    pub log: Arc<dyn RecordLog>,
    pub policy: Arc<PolicyGate>,
    pub auth: AuthConfig,
    pub info: ServiceInfo,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// All routes. `/health` is public, everything under `/v1` needs the token.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/feeds", get(handlers::list_feeds).post(handlers::register_feed))
        .route("/v1/feeds/{pubkey}", delete(handlers::delete_feed))
        .route("/v1/check", post(handlers::check_feeds))
        .route("/v1/export", get(handlers::export_feeds))
        .route("/v1/import", post(handlers::import_feeds))
        .route("/v1/follows", post(handlers::update_follows))
        .route("/v1/records", get(handlers::query_records).post(handlers::submit_record))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), FeedstrError> {
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FeedstrError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(addr = %addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| FeedstrError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
