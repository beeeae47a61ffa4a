//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for business logic.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::response::{api_ok, api_success};
use crate::api::sse::sse_handler;
use crate::api::AppState;
use crate::error::ControlResult;
use crate::project::runtime::LoadOutcome;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/state", get(get_current_state))
        .route("/api/devices", get(list_devices))
        .route("/api/devices/connect", post(connect_all_devices))
        .route("/api/devices/disconnect", post(disconnect_all_devices))
        .route("/api/devices/{id}/connect", post(connect_device))
        .route("/api/devices/{id}/disconnect", post(disconnect_device))
        .route("/api/projects/{id}/load", post(load_project))
        .route("/api/projects/{id}/unload", post(unload_project))
        .route("/api/items/{id}/play", post(play_item))
        .route("/api/items/{id}/stop", post(stop_item))
        .route("/api/items/{id}/update", post(update_item))
        .route("/api/events/sse", get(sse_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe: "Is the process running?"
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": "cuelist",
        "projectLoaded": state.runtime.is_loaded(),
    }))
}

/// Returns current system state (project snapshot, device states, observers).
async fn get_current_state(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({
        "project": state.runtime.snapshot(),
        "devices": state.registry.snapshot(),
        "observers": state.fanout.observer_count(),
    }))
}

async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({ "devices": state.registry.snapshot() }))
}

/// Connects every configured device; per-device failures are reported, not fatal.
async fn connect_all_devices(State(state): State<AppState>) -> impl IntoResponse {
    let failures = state.orchestrator.connect_all_devices().await;
    api_success(json!({
        "success": failures.is_empty(),
        "failures": failures,
    }))
}

async fn disconnect_all_devices(State(state): State<AppState>) -> impl IntoResponse {
    let failures = state.orchestrator.disconnect_all_devices().await;
    api_success(json!({
        "success": failures.is_empty(),
        "failures": failures,
    }))
}

async fn connect_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ControlResult<impl IntoResponse> {
    state.orchestrator.connect_device(&id).await?;
    Ok(api_ok())
}

async fn disconnect_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ControlResult<impl IntoResponse> {
    state.orchestrator.disconnect_device(&id).await?;
    Ok(api_ok())
}

async fn load_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ControlResult<impl IntoResponse> {
    let outcome = state.orchestrator.load_project(&id).await?;
    let outcome = match outcome {
        LoadOutcome::Loaded => "loaded",
        LoadOutcome::AlreadyLoaded => "alreadyLoaded",
    };
    Ok(api_success(json!({
        "success": true,
        "outcome": outcome,
        "project": state.runtime.snapshot(),
    })))
}

async fn unload_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ControlResult<impl IntoResponse> {
    let failures = state.orchestrator.unload_project(&id).await?;
    Ok(api_success(json!({
        "success": true,
        "stopFailures": failures,
    })))
}

async fn play_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ControlResult<impl IntoResponse> {
    state.orchestrator.play(&id).await?;
    Ok(api_ok())
}

async fn stop_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ControlResult<impl IntoResponse> {
    state.orchestrator.stop(&id).await?;
    Ok(api_ok())
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<serde_json::Map<String, serde_json::Value>>,
) -> ControlResult<impl IntoResponse> {
    state.orchestrator.update_template_data(&id, data).await?;
    Ok(api_ok())
}
