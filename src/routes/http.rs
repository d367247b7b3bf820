// HTTP handlers: dashboard view, toggles, layout, refresh, session, connectors, AWS controls

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;

use super::AppState;
use crate::backend_repo::FetchError;
use crate::models::{FirewallRule, Provider, ScaleRequest};
use crate::session::UserInfo;
use crate::version::{NAME, VERSION};
use crate::wizard::{self, SetupError, SetupWizard};

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.to_string() })),
    )
        .into_response()
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/dashboard: rendered widgets in layout order.
pub(super) async fn dashboard_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.render().await)
}

pub(super) async fn widgets_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.catalog().await)
}

pub(super) async fn groups_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dashboard.groups().await)
}

pub(super) async fn connectors_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.connectors().await)
}

pub(super) async fn toggle_widget_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.dashboard.toggle_widget(&id).await {
        Ok(visible) => Json(serde_json::json!({ "id": id, "visible": visible })).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e),
    }
}

pub(super) async fn toggle_group_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.dashboard.toggle_group(&id).await {
        Ok(visible) => Json(serde_json::json!({ "id": id, "visible": visible })).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e),
    }
}

/// POST /api/widgets/{id}/refresh: manual retry; always accepted for a known widget.
pub(super) async fn refresh_widget_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    if state.poller.refresh(&id).await {
        (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "id": id, "refreshing": true })),
        )
            .into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, format!("unknown widget: {}", id))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MoveRequest {
    drag_index: usize,
    hover_index: usize,
    /// Indices refer to the rendered list (default) or to the full order.
    #[serde(default = "default_visible")]
    visible: bool,
}

fn default_visible() -> bool {
    true
}

pub(super) async fn move_card_handler(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Response {
    match state
        .dashboard
        .move_card(req.drag_index, req.hover_index, req.visible)
        .await
    {
        Ok(order) => Json(serde_json::json!({ "order": order })).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

/// POST /api/connectors/{provider}: wizard form fields; on success the provider's widgets
/// are refreshed right away.
pub(super) async fn connect_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(form): Json<HashMap<String, String>>,
) -> Response {
    let Some(provider) = Provider::parse(&provider) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("unknown provider: {}", provider),
        );
    };
    let wizard = match SetupWizard::from_form(
        provider,
        form.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    ) {
        Ok(w) => w,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };
    match wizard::submit(&state.repo, &state.session, &wizard).await {
        Ok(()) => {
            for desc in state.dashboard.descriptors().await {
                if desc.provider == provider {
                    state.poller.refresh(&desc.id).await;
                }
            }
            Json(state.session.connectors().await).into_response()
        }
        Err(SetupError::Wizard(e)) => error_response(StatusCode::BAD_REQUEST, e),
        Err(SetupError::Fetch(FetchError::Unauthenticated)) => {
            error_response(StatusCode::UNAUTHORIZED, FetchError::Unauthenticated)
        }
        Err(SetupError::Fetch(e)) => {
            tracing::warn!(error = %e, provider = %provider, "connector setup failed");
            error_response(StatusCode::BAD_GATEWAY, e)
        }
    }
}

/// DELETE /api/connectors/{provider}: local disconnect; the provider's widgets are cleared.
pub(super) async fn disconnect_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Response {
    let Some(provider) = Provider::parse(&provider) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("unknown provider: {}", provider),
        );
    };
    state.dashboard.disconnect(provider).await;
    Json(state.session.connectors().await).into_response()
}

async fn session_body(state: &AppState) -> Value {
    serde_json::json!({
        "signedIn": state.session.is_signed_in().await,
        "user": state.session.user().await,
        "connectors": state.session.connectors().await,
    })
}

pub(super) async fn session_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(session_body(&state).await)
}

/// POST /api/session: sign in, load connector flags and refresh every widget.
pub(super) async fn sign_in_handler(
    State(state): State<AppState>,
    Json(user): Json<UserInfo>,
) -> Response {
    if let Err(e) = state.session.sign_in(&state.repo, user).await {
        return error_response(StatusCode::UNAUTHORIZED, e);
    }
    for desc in state.dashboard.descriptors().await {
        state.poller.refresh(&desc.id).await;
    }
    Json(session_body(&state).await).into_response()
}

/// DELETE /api/session: sign out; every widget is cleared and late responses are dropped.
pub(super) async fn sign_out_handler(State(state): State<AppState>) -> Response {
    state.dashboard.sign_out().await;
    Json(session_body(&state).await).into_response()
}

/// Token for an AWS control action, or the response to send instead.
async fn aws_control_token(state: &AppState) -> Result<String, Response> {
    let Some(token) = state.session.token().await else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            FetchError::Unauthenticated,
        ));
    };
    if !state.session.connectors().await.aws {
        return Err(error_response(
            StatusCode::CONFLICT,
            "aws connector is not configured",
        ));
    }
    Ok(token)
}

fn control_response(operation: &'static str, result: Result<Value, FetchError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation, "aws control action failed");
            error_response(StatusCode::BAD_GATEWAY, e)
        }
    }
}

/// POST /api/aws/scale {asg, desired_capacity}
pub(super) async fn aws_scale_handler(
    State(state): State<AppState>,
    Json(request): Json<ScaleRequest>,
) -> Response {
    let token = match aws_control_token(&state).await {
        Ok(token) => token,
        Err(response) => return response,
    };
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, e);
    }
    tracing::info!(
        asg = %request.asg,
        desired_capacity = request.desired_capacity,
        "scaling auto scaling group"
    );
    control_response("scale_asg", state.repo.scale_asg(&request, &token).await)
}

/// POST /api/aws/security/firewall {sg_id, port, protocol, cidr}
pub(super) async fn aws_firewall_handler(
    State(state): State<AppState>,
    Json(rule): Json<FirewallRule>,
) -> Response {
    let token = match aws_control_token(&state).await {
        Ok(token) => token,
        Err(response) => return response,
    };
    if let Err(e) = rule.validate() {
        return error_response(StatusCode::BAD_REQUEST, e);
    }
    tracing::info!(
        sg_id = %rule.sg_id,
        port = rule.port,
        protocol = %rule.protocol,
        cidr = %rule.cidr,
        "adding firewall rule"
    );
    control_response(
        "add_firewall_rule",
        state.repo.add_firewall_rule(&rule, &token).await,
    )
}
