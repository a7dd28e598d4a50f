use serde::{Deserialize, Serialize};

use super::{EquipSlot, ItemId};

/// A melding item: the stat it grants and its tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Materia {
    pub item_id: ItemId,
    pub stat: String,
    pub tier: u8,
}

/// One melding slot on a gearpiece.
///
/// `tier` is the tier the gearset asks for. `max_tier` is the highest tier
/// the slot accepts when overmelding is preferred; it defaults to `tier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeldSlot {
    pub stat: String,
    pub tier: u8,
    #[serde(default)]
    pub max_tier: Option<u8>,
}

impl MeldSlot {
    pub fn ceiling(&self, overmeld: bool) -> u8 {
        if overmeld {
            self.max_tier.unwrap_or(self.tier).max(self.tier)
        } else {
            self.tier
        }
    }
}

/// How materia tiers are chosen for each slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeldStrategy {
    /// Exactly the requested tier.
    Exact,
    /// The highest owned tier up to the slot's ceiling.
    Overmeld,
}

/// A materia placed into one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeldAssignment {
    pub slot_index: usize,
    pub materia: Materia,
}

/// Ordered assignments for one gearpiece.
///
/// Slots are filled strictly in index order; `assignments` is a prefix of
/// the piece's slots and stops at the first slot that cannot be filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeldPlan {
    pub slot: EquipSlot,
    pub assignments: Vec<MeldAssignment>,
    pub slot_count: usize,
}

impl MeldPlan {
    pub fn is_complete(&self) -> bool {
        self.assignments.len() == self.slot_count
    }
}

/// One alternative meld plan for a whole gearset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearsetMeldPlan {
    pub strategy: MeldStrategy,
    pub pieces: Vec<MeldPlan>,
}

/// The plan list the UI picks from, plus its current pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeldPlanList {
    pub plans: Vec<GearsetMeldPlan>,
    pub selected: usize,
}
