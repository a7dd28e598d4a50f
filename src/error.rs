//! Error type for tracker operations.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{EquipSlot, ItemId};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Gearset limit reached ({max} gearsets)")]
    TooManyGearsets { max: usize },

    #[error("Gearset not found: {0}")]
    GearsetNotFound(Uuid),

    #[error("Gearpiece not found: {gearset_id} slot {slot:?}")]
    GearpieceNotFound { gearset_id: Uuid, slot: EquipSlot },

    #[error("Prerequisite node not found at path {path:?}")]
    NodeNotFound { path: Vec<usize> },

    #[error("Invalid gearset definition: {0}")]
    InvalidDefinition(String),

    #[error("Unknown item id {0}")]
    UnknownItem(ItemId),

    #[error("Update queue is not running")]
    QueueClosed,

    #[error("Queued task did not complete")]
    TaskAborted,

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
