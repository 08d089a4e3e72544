//! HTTP API for the GreenITE service.
//!
//! This module provides the REST API endpoints for:
//! - Health and metrics monitoring
//! - Login, logout and session status
//! - Sustainable actions, badges and bill comparison
//! - Settings
//! - WebSocket connections

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::activity::MAX_UPLOAD_BYTES;
use crate::error::{I18nError, ServiceError};
use crate::service::GreeniteService;
use crate::websocket::handle_ws_connection;

pub mod activity;
pub mod auth;
pub mod settings;
use activity::{
    add_action_handler, badges_handler, compare_bills_handler, list_actions_handler,
    upload_action_handler,
};
use auth::{
    login_handler, logout_handler, session_handler, validate_email_handler,
    validate_password_handler,
};
use settings::{get_settings_handler, update_settings_handler};

/// Application state
pub struct AppState {
    pub service: Arc<GreeniteService>,
    pub start_time: Instant,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create an i18n-aware error from a service error
    pub fn i18n_error(&self, error: ServiceError) -> I18nError {
        I18nError::new(error, self.service.i18n.clone(), "en")
    }
}

/// Build the API router
pub fn router(service: Arc<GreeniteService>, metrics: Option<PrometheusHandle>) -> Router {
    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
        metrics,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Auth endpoints
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/session", get(session_handler))
        .route("/auth/validate-email", post(validate_email_handler))
        .route("/auth/validate-password", post(validate_password_handler))
        // Activity endpoints
        .route("/actions", get(list_actions_handler).post(add_action_handler))
        // Oversized files still reach the handler so they get the usual rejection
        .route(
            "/actions/upload",
            post(upload_action_handler)
                .layer(DefaultBodyLimit::max(2 * MAX_UPLOAD_BYTES as usize)),
        )
        .route("/badges", get(badges_handler))
        .route("/bills/compare", post(compare_bills_handler))
        // Settings endpoints
        .route(
            "/settings",
            get(get_settings_handler).put(update_settings_handler),
        );

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/ws", get(ws_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.service.i18n.get("en", "health-status-healthy", None),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        connections: state.service.ws_manager.connection_count(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    connections: usize,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

// === WebSocket ===

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state.service.clone()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::service::test_support::test_service;

    pub(crate) fn test_state() -> Arc<AppState> {
        let (service, _clock) = test_service();
        Arc::new(AppState {
            service,
            start_time: Instant::now(),
            metrics: None,
        })
    }
}
