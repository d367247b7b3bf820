// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tower_http::cors::{Any, CorsLayer};

use crate::backend_repo::BackendRepo;
use crate::dashboard::Dashboard;
use crate::session::Session;
use crate::worker::Poller;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dashboard: Arc<Dashboard>,
    pub(crate) poller: Arc<Poller>,
    pub(crate) session: Arc<Session>,
    pub(crate) repo: Arc<BackendRepo>,
    pub(crate) ws_dashboard_connections: Arc<AtomicUsize>,
}

pub fn app(
    dashboard: Arc<Dashboard>,
    poller: Arc<Poller>,
    session: Arc<Session>,
    repo: Arc<BackendRepo>,
    ws_dashboard_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        dashboard,
        poller,
        session,
        repo,
        ws_dashboard_connections,
    };
    Router::new()
        .route("/", get(|| async { "cloudboard: dashboard engine up" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/dashboard", get(http::dashboard_handler)) // GET /api/dashboard
        .route("/api/widgets", get(http::widgets_handler)) // GET /api/widgets
        .route("/api/widgets/{id}/toggle", post(http::toggle_widget_handler))
        .route("/api/widgets/{id}/refresh", post(http::refresh_widget_handler))
        .route("/api/groups", get(http::groups_handler)) // GET /api/groups
        .route("/api/groups/{id}/toggle", post(http::toggle_group_handler))
        .route("/api/layout/move", post(http::move_card_handler))
        .route("/api/connectors", get(http::connectors_handler)) // GET /api/connectors
        .route(
            "/api/connectors/{provider}",
            post(http::connect_handler).delete(http::disconnect_handler),
        )
        .route(
            "/api/session",
            get(http::session_handler)
                .post(http::sign_in_handler)
                .delete(http::sign_out_handler),
        )
        .route("/api/aws/scale", post(http::aws_scale_handler))
        .route("/api/aws/security/firewall", post(http::aws_firewall_handler))
        .route("/ws/dashboard", get(ws::ws_dashboard)) // WS /ws/dashboard
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
