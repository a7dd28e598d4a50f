use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ItemId;

/// Stable per-player identity (the game's content id).
pub type PlayerId = u64;

/// Inventory container kinds reported by the game client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Inventory1,
    Inventory2,
    Inventory3,
    Inventory4,
    EquippedItems,
    ArmoryMainHand,
    ArmoryOffHand,
    ArmoryHead,
    ArmoryBody,
    ArmoryHands,
    ArmoryLegs,
    ArmoryFeet,
    ArmoryEar,
    ArmoryNeck,
    ArmoryWrist,
    ArmoryRings,
    ArmorySoulCrystal,
    SaddleBag1,
    SaddleBag2,
    PremiumSaddleBag1,
    PremiumSaddleBag2,
    Retainer,
    Crystals,
    Currency,
}

impl ContainerKind {
    pub const BAGS: [Self; 4] = [
        Self::Inventory1,
        Self::Inventory2,
        Self::Inventory3,
        Self::Inventory4,
    ];

    pub const ARMORY: [Self; 12] = [
        Self::ArmoryMainHand,
        Self::ArmoryOffHand,
        Self::ArmoryHead,
        Self::ArmoryBody,
        Self::ArmoryHands,
        Self::ArmoryLegs,
        Self::ArmoryFeet,
        Self::ArmoryEar,
        Self::ArmoryNeck,
        Self::ArmoryWrist,
        Self::ArmoryRings,
        Self::ArmorySoulCrystal,
    ];

    /// Bags, equipped items and the armoury chest.
    pub fn default_tracked() -> Vec<Self> {
        let mut kinds = Self::BAGS.to_vec();
        kinds.push(Self::EquippedItems);
        kinds.extend(Self::ARMORY);
        kinds
    }
}

/// Inventory change notification from the game client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryEvent {
    Added {
        container: ContainerKind,
        item_id: ItemId,
        quantity: u32,
    },
    Removed {
        container: ContainerKind,
        item_id: ItemId,
        quantity: u32,
    },
    /// Quantity or metadata changed in place.
    Changed {
        container: ContainerKind,
        item_id: ItemId,
        quantity: u32,
    },
    Moved {
        source: ContainerKind,
        target: ContainerKind,
        item_id: ItemId,
    },
}

impl InventoryEvent {
    pub fn item_id(&self) -> ItemId {
        match *self {
            Self::Added { item_id, .. }
            | Self::Removed { item_id, .. }
            | Self::Changed { item_id, .. }
            | Self::Moved { item_id, .. } => item_id,
        }
    }
}

/// Owned quantity per item id, summed over the sampled containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedItems(HashMap<ItemId, u32>);

impl OwnedItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity owned, 0 if absent.
    pub fn get(&self, item_id: ItemId) -> u32 {
        self.0.get(&item_id).copied().unwrap_or(0)
    }

    pub fn add(&mut self, item_id: ItemId, quantity: u32) {
        let entry = self.0.entry(item_id).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.0.iter().map(|(&id, &qty)| (id, qty))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ItemId, u32)> for OwnedItems {
    fn from_iter<I: IntoIterator<Item = (ItemId, u32)>>(iter: I) -> Self {
        let mut owned = Self::new();
        for (id, qty) in iter {
            owned.add(id, qty);
        }
        owned
    }
}
