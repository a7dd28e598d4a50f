//! Request and response bodies that are specific to the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::models::PlayerId;
use crate::router::Routing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// `None` while logged out.
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveInput {
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectPlanInput {
    pub index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    pub routing: Routing,
}
