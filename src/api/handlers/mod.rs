use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use super::{AppState, EventResponse, LoginInput, SelectPlanInput, SessionInfo, SetActiveInput};
use crate::error::TrackerError;
use crate::models::*;
use crate::queue::Ticket;

type ApiError = (StatusCode, String);

// ============================================================
// Error Handling
// ============================================================

/// Map a tracker error to a response.
///
/// Validation and lookup failures are returned as-is. Storage faults are
/// logged server-side and clients only see a generic message.
fn tracker_error(e: TrackerError) -> ApiError {
    let status = match &e {
        TrackerError::GearsetNotFound(_)
        | TrackerError::GearpieceNotFound { .. }
        | TrackerError::NodeNotFound { .. } => StatusCode::NOT_FOUND,
        TrackerError::TooManyGearsets { .. }
        | TrackerError::InvalidDefinition(_)
        | TrackerError::UnknownItem(_) => StatusCode::BAD_REQUEST,
        TrackerError::QueueClosed | TrackerError::TaskAborted => StatusCode::SERVICE_UNAVAILABLE,
        TrackerError::Storage(_) => {
            tracing::error!("Internal error: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };

    tracing::warn!("Request failed: {}", e);
    (status, e.to_string())
}

/// Wait for a queued command.
async fn run<T>(ticket: crate::error::Result<Ticket<T>>) -> Result<T, ApiError> {
    ticket
        .map_err(tracker_error)?
        .wait()
        .await
        .map_err(tracker_error)
}

fn not_found(id: Uuid) -> ApiError {
    tracker_error(TrackerError::GearsetNotFound(id))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Session
// ============================================================

pub async fn get_session(State(state): State<AppState>) -> Json<SessionInfo> {
    Json(SessionInfo {
        player_id: state.tracker.player(),
    })
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<SessionInfo>, ApiError> {
    run(state.tracker.login(input.player_id)).await?;
    Ok(Json(SessionInfo {
        player_id: Some(input.player_id),
    }))
}

pub async fn logout(State(state): State<AppState>) -> Result<Json<SessionInfo>, ApiError> {
    run(state.tracker.logout()).await?;
    Ok(Json(SessionInfo { player_id: None }))
}

// ============================================================
// Gearsets
// ============================================================

pub async fn list_gearsets(State(state): State<AppState>) -> Json<Vec<Gearset>> {
    Json(state.tracker.gearsets())
}

pub async fn import_gearset(
    State(state): State<AppState>,
    Json(definition): Json<GearsetDefinition>,
) -> Result<(StatusCode, Json<Gearset>), ApiError> {
    let id = run(state.tracker.import_gearset(definition)).await?;
    state
        .tracker
        .gearset(id)
        .map(|g| (StatusCode::CREATED, Json(g)))
        .ok_or_else(|| not_found(id))
}

pub async fn get_gearset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Gearset>, ApiError> {
    state.tracker.gearset(id).map(Json).ok_or_else(|| not_found(id))
}

pub async fn delete_gearset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    run(state.tracker.remove_gearset(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SetActiveInput>,
) -> Result<Json<Gearset>, ApiError> {
    run(state.tracker.set_active(id, input.is_active)).await?;
    state.tracker.gearset(id).map(Json).ok_or_else(|| not_found(id))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GearsetProgress>, ApiError> {
    state.tracker.progress(id).map(Json).ok_or_else(|| not_found(id))
}

pub async fn set_lock(
    State(state): State<AppState>,
    Path((id, slot)): Path<(Uuid, EquipSlot)>,
    Json(input): Json<SetLockInput>,
) -> Result<Json<Gearset>, ApiError> {
    run(state.tracker.set_lock(id, slot, input)).await?;
    state.tracker.gearset(id).map(Json).ok_or_else(|| not_found(id))
}

pub async fn list_needed_items(State(state): State<AppState>) -> Json<Vec<NeededItem>> {
    Json(state.tracker.needed_items())
}

// ============================================================
// Meld plans
// ============================================================

pub async fn get_meld_plans(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MeldPlanList>, ApiError> {
    state.tracker.meld_plans(id).map(Json).map_err(tracker_error)
}

pub async fn select_meld_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SelectPlanInput>,
) -> Result<Json<MeldPlanList>, ApiError> {
    state
        .tracker
        .select_meld_plan(id, input.index)
        .map_err(tracker_error)?;
    state.tracker.meld_plans(id).map(Json).map_err(tracker_error)
}

// ============================================================
// Inventory bridge
// ============================================================

pub async fn rescan(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    run(state.tracker.request_rescan()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept a change notification. The recompute, if any, runs later.
pub async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<InventoryEvent>,
) -> (StatusCode, Json<EventResponse>) {
    let routing = state.tracker.handle_event(&event);
    (StatusCode::ACCEPTED, Json(EventResponse { routing }))
}

/// Replace one container's contents. Does not by itself trigger a
/// recompute; follow up with an event or a rescan.
pub async fn put_container(
    State(state): State<AppState>,
    Path(container): Path<ContainerKind>,
    Json(items): Json<HashMap<ItemId, u32>>,
) -> StatusCode {
    state.inventory.set_container(container, items);
    StatusCode::NO_CONTENT
}
