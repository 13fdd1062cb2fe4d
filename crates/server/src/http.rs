//! HTTP endpoints
//!
//! Operational surface only; call media arrives through the transport
//! adapters that feed the session table.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::metrics::set_active_sessions;
use crate::state::AppState;

/// Records returned by `/logs`
pub const RECENT_LOG_LIMIT: usize = 20;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/logs", get(recent_logs))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id", delete(end_session))
        .route("/api/tools", get(list_tools))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "receptionist",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.sessions.count(),
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => {
            set_active_sessions(state.sessions.count());
            (StatusCode::OK, handle.render())
        },
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}

/// Most recent call records, newest first
async fn recent_logs(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(store) = state.call_log.as_ref() else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    match store.recent(RECENT_LOG_LIMIT).await {
        Ok(records) => Ok(Json(serde_json::json!({
            "backend": store.backend_name(),
            "count": records.len(),
            "records": records,
        }))),
        Err(e) => {
            tracing::error!(backend = store.backend_name(), error = %e, "Failed to read call log");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}

async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "sessions": sessions,
        "count": sessions.len(),
        "max_sessions": state.sessions.max_sessions(),
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let call = session.session();

    Ok(Json(serde_json::json!({
        "call_id": call.call_id,
        "caller_id": call.caller_id,
        "started_at": call.started_at,
        "state": call.state.to_string(),
        "turn_state": format!("{:?}", session.turns().state()),
        "messages": session.context().len(),
    })))
}

/// Hang up a call from the operator side
async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.sessions.disconnect(&id, "ended by operator").await {
        Some(record) => Ok(Json(serde_json::json!({ "record": record }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn list_tools(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tools: Vec<serde_json::Value> = state
        .tools
        .definitions()
        .into_iter()
        .map(|t| {
            serde_json::json!({
                "name": t.name,
                "description": t.description,
            })
        })
        .collect();

    Json(serde_json::json!({ "tools": tools }))
}
