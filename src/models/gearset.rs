use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ItemId, MeldSlot, PrerequisiteNode};

/// Equipment slot a gearpiece occupies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    MainHand,
    OffHand,
    Head,
    Body,
    Hands,
    Legs,
    Feet,
    Ears,
    Neck,
    Wrists,
    RingLeft,
    RingRight,
}

impl EquipSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainHand => "main_hand",
            Self::OffHand => "off_hand",
            Self::Head => "head",
            Self::Body => "body",
            Self::Hands => "hands",
            Self::Legs => "legs",
            Self::Feet => "feet",
            Self::Ears => "ears",
            Self::Neck => "neck",
            Self::Wrists => "wrists",
            Self::RingLeft => "ring_left",
            Self::RingRight => "ring_right",
        }
    }
}

/// One equipment slot of a gearset.
///
/// The gearpiece's own `collected`/`locked` flags mirror the root node but
/// are independently lockable: the finished piece may leave tracked
/// inventory (e.g. when equipped elsewhere) without its prerequisites
/// becoming uncollected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gearpiece {
    pub slot: EquipSlot,
    /// The end-state item.
    pub item_id: ItemId,
    pub name: String,
    pub root: PrerequisiteNode,
    #[serde(default)]
    pub collected: bool,
    #[serde(default)]
    pub locked: bool,
    /// Melding slots in the order the game fills them.
    #[serde(default)]
    pub melds: Vec<MeldSlot>,
}

/// A user-named set of gearpieces for one job.
///
/// Inactive gearsets are excluded from needed-item queries and automatic
/// recomputes. `position` is the creation order used for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gearset {
    pub id: Uuid,
    pub name: String,
    pub job: String,
    pub is_active: bool,
    pub position: u32,
    pub pieces: Vec<Gearpiece>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gearset {
    pub fn is_collected(&self) -> bool {
        self.pieces.iter().all(|p| p.collected)
    }
}

/// External gearset definition accepted by import.
///
/// Produced by whatever parses a third-party gear planner export; only the
/// shape is fixed here. Collected and lock state in the blob is discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearsetDefinition {
    pub name: String,
    pub job: String,
    /// Defaults to `true` if not specified.
    #[serde(default)]
    pub is_active: Option<bool>,
    pub pieces: Vec<GearpieceDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearpieceDefinition {
    pub slot: EquipSlot,
    pub item_id: ItemId,
    pub name: String,
    /// Acquisition tree. `None` means the piece is only obtainable directly.
    #[serde(default)]
    pub prerequisites: Option<PrerequisiteNode>,
    #[serde(default)]
    pub melds: Vec<MeldSlot>,
}

/// Input for changing a lock inside a gearpiece.
///
/// With no `path` the gearpiece's own lock is targeted. Supplying
/// `collected` sets that state before locking ("mark as obtained").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLockInput {
    #[serde(default)]
    pub path: Option<Vec<usize>>,
    pub locked: bool,
    #[serde(default)]
    pub collected: Option<bool>,
}

/// Aggregate completion of a gearpiece or gearset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub collected: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.collected as f32 / self.total as f32
    }

    pub fn is_complete(&self) -> bool {
        self.collected >= self.total
    }
}

impl std::ops::Add for Progress {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            collected: self.collected + rhs.collected,
            total: self.total + rhs.total,
        }
    }
}

/// Per-gearset completion summary for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearsetProgress {
    pub gearset_id: Uuid,
    pub collected: bool,
    pub progress: Progress,
    pub pieces: Vec<GearpieceProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearpieceProgress {
    pub slot: EquipSlot,
    pub collected: bool,
    pub progress: Progress,
}

/// Outstanding demand for one item across active gearsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeededItem {
    pub item_id: ItemId,
    pub required: u32,
    pub owned: u32,
}
