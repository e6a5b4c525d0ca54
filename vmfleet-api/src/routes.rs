//! HTTP routes
//!
//! Thin axum handlers translating requests into registry and lifecycle calls.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use vmfleet_common::{Host, HostConnection, Vm};

use crate::error::ApiError;
use crate::health::{HealthResponse, HealthStatus, PingResponse};
use crate::inventory;
use crate::lifecycle::LifecycleAction;
use crate::state::AppState;
use crate::validation;

/// Body of a migration request
#[derive(Debug, Deserialize)]
pub struct MigrateRequest {
    pub target_host: String,
}

/// Build the complete API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health))
        .merge(host_routes())
        .merge(vm_routes())
        .merge(hypervisor_routes())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

// =============================================================================
// Route Builder Functions
// =============================================================================

/// Host CRUD and refresh
fn host_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/hosts", get(list_hosts).post(create_host))
        .route(
            "/hosts/:host_id",
            get(get_host).put(update_host).delete(delete_host),
        )
        .route("/hosts/:host_id/refresh", post(refresh_host))
}

/// Hypervisor queries spanning every host or no registered host at all
fn hypervisor_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/refresh", post(refresh_all))
        .route("/hypervisor/vms", post(query_hypervisor))
}

/// VM CRUD, lifecycle actions, copy and migrate
fn vm_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/hosts/:host_id/vms", get(list_vms).post(create_vm))
        .route("/hosts/:host_id/vms/:vm_id", get(get_vm).delete(delete_vm))
        .route("/hosts/:host_id/vms/:vm_id/start", post(start_vm))
        .route("/hosts/:host_id/vms/:vm_id/reboot", post(reboot_vm))
        .route("/hosts/:host_id/vms/:vm_id/reset", post(reset_vm))
        .route("/hosts/:host_id/vms/:vm_id/shutdown", post(shutdown_vm))
        .route("/hosts/:host_id/vms/:vm_id/destroy", post(destroy_vm))
        .route("/hosts/:host_id/vms/:vm_id/copy", post(copy_vm))
        .route("/vms/:vm_id/migrate", post(migrate_vm))
}

// =============================================================================
// Health
// =============================================================================

async fn ping() -> Json<PingResponse> {
    Json(PingResponse::pong())
}

/// 503 once shutdown has begun so load balancers stop routing here
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let stats = state.registry.stats().await;
    let report = state.health.report(stats, state.shutdown.is_shutting_down());

    let status = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Draining => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}

// =============================================================================
// Hosts
// =============================================================================

async fn list_hosts(State(state): State<Arc<AppState>>) -> Json<Vec<Host>> {
    Json(state.registry.list_hosts().await)
}

async fn create_host(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Host>, JsonRejection>,
) -> Result<(StatusCode, Json<Host>), ApiError> {
    let Json(host) = payload?;
    validation::validate_host(&host)?;

    let host = state.registry.create_host(host).await;
    Ok((StatusCode::CREATED, Json(host)))
}

async fn get_host(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<String>,
) -> Result<Json<Host>, ApiError> {
    Ok(Json(state.registry.get_host(&host_id).await?))
}

/// Same semantics as create; the record is stored under the path identifier
async fn update_host(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<String>,
    payload: Result<Json<Host>, JsonRejection>,
) -> Result<Json<Host>, ApiError> {
    let Json(mut host) = payload?;
    host.id = host_id;
    validation::validate_host(&host)?;

    Ok(Json(state.registry.create_host(host).await))
}

async fn delete_host(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.registry.delete_host(&host_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn refresh_host(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<String>,
) -> Result<Json<Host>, ApiError> {
    let host = inventory::refresh_host(&state.registry, state.inventory.as_ref(), &host_id).await?;
    Ok(Json(host))
}

// =============================================================================
// Hypervisor
// =============================================================================

async fn refresh_all(State(state): State<Arc<AppState>>) -> Json<Vec<Host>> {
    Json(inventory::refresh_all(&state.registry, state.inventory.as_ref()).await)
}

/// List the VMs of an arbitrary hypervisor without registering it
async fn query_hypervisor(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<HostConnection>, JsonRejection>,
) -> Result<Json<Vec<Vm>>, ApiError> {
    let Json(connection) = payload?;
    Ok(Json(state.inventory.fetch_vms(&connection).await))
}

// =============================================================================
// VMs
// =============================================================================

async fn list_vms(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<String>,
) -> Result<Json<Vec<Vm>>, ApiError> {
    Ok(Json(state.registry.list_vms(&host_id).await?))
}

async fn create_vm(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<String>,
    payload: Result<Json<Vm>, JsonRejection>,
) -> Result<(StatusCode, Json<Vm>), ApiError> {
    let Json(vm) = payload?;
    validation::validate_vm(&vm)?;

    let vm = state.registry.create_vm(&host_id, vm).await?;
    Ok((StatusCode::CREATED, Json(vm)))
}

async fn get_vm(
    State(state): State<Arc<AppState>>,
    Path((host_id, vm_id)): Path<(String, String)>,
) -> Result<Json<Vm>, ApiError> {
    Ok(Json(state.registry.get_vm(&host_id, &vm_id).await?))
}

async fn delete_vm(
    State(state): State<Arc<AppState>>,
    Path((host_id, vm_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.registry.delete_vm(&host_id, &vm_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_status(
    state: &AppState,
    host_id: &str,
    vm_id: &str,
    action: LifecycleAction,
) -> Result<Json<Vm>, ApiError> {
    Ok(Json(state.registry.apply_action(host_id, vm_id, action).await?))
}

async fn start_vm(
    State(state): State<Arc<AppState>>,
    Path((host_id, vm_id)): Path<(String, String)>,
) -> Result<Json<Vm>, ApiError> {
    change_status(&state, &host_id, &vm_id, LifecycleAction::Start).await
}

async fn reboot_vm(
    State(state): State<Arc<AppState>>,
    Path((host_id, vm_id)): Path<(String, String)>,
) -> Result<Json<Vm>, ApiError> {
    change_status(&state, &host_id, &vm_id, LifecycleAction::Reboot).await
}

async fn reset_vm(
    State(state): State<Arc<AppState>>,
    Path((host_id, vm_id)): Path<(String, String)>,
) -> Result<Json<Vm>, ApiError> {
    change_status(&state, &host_id, &vm_id, LifecycleAction::Reset).await
}

async fn shutdown_vm(
    State(state): State<Arc<AppState>>,
    Path((host_id, vm_id)): Path<(String, String)>,
) -> Result<Json<Vm>, ApiError> {
    change_status(&state, &host_id, &vm_id, LifecycleAction::Shutdown).await
}

async fn destroy_vm(
    State(state): State<Arc<AppState>>,
    Path((host_id, vm_id)): Path<(String, String)>,
) -> Result<Json<Vm>, ApiError> {
    change_status(&state, &host_id, &vm_id, LifecycleAction::Destroy).await
}

async fn copy_vm(
    State(state): State<Arc<AppState>>,
    Path((host_id, vm_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Vm>), ApiError> {
    let copy = state.registry.copy_vm(&host_id, &vm_id).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

async fn migrate_vm(
    State(state): State<Arc<AppState>>,
    Path(vm_id): Path<String>,
    payload: Result<Json<MigrateRequest>, JsonRejection>,
) -> Result<Json<Vm>, ApiError> {
    let Json(request) = payload?;
    validation::validate_id("Host", &request.target_host)?;

    let vm = state.registry.migrate_vm(&vm_id, &request.target_host).await?;
    Ok(Json(vm))
}
