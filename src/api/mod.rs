mod handlers;
mod types;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use types::*;

use crate::inventory::MemoryInventory;
use crate::tracker::Tracker;

/// Shared handler state.
///
/// `inventory` is the in-memory copy the game-client bridge keeps in sync;
/// it must be the same instance the tracker samples.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Tracker,
    pub inventory: Arc<MemoryInventory>,
}

pub fn create_router(tracker: Tracker, inventory: Arc<MemoryInventory>) -> Router {
    let api = Router::new()
        // Session
        .route("/session", get(handlers::get_session))
        .route("/session/login", post(handlers::login))
        .route("/session/logout", post(handlers::logout))
        // Gearsets
        .route("/gearsets", get(handlers::list_gearsets))
        .route("/gearsets", post(handlers::import_gearset))
        .route("/gearsets/{id}", get(handlers::get_gearset))
        .route("/gearsets/{id}", delete(handlers::delete_gearset))
        .route("/gearsets/{id}/active", put(handlers::set_active))
        .route("/gearsets/{id}/progress", get(handlers::get_progress))
        .route("/gearsets/{id}/melds", get(handlers::get_meld_plans))
        .route("/gearsets/{id}/melds/selected", put(handlers::select_meld_plan))
        .route("/gearsets/{id}/pieces/{slot}/lock", put(handlers::set_lock))
        .route("/needed", get(handlers::list_needed_items))
        // Inventory bridge
        .route("/rescan", post(handlers::rescan))
        .route("/events", post(handlers::post_event))
        .route("/inventory/{container}", put(handlers::put_container))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { tracker, inventory })
}
