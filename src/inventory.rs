//! Interfaces to the game client's inventory and item data.
//!
//! The tracker never reads game memory itself. A host binds
//! [`InventorySource`] and [`ItemCatalog`] to whatever supplies inventory
//! contents and item metadata; [`MemoryInventory`] and [`MemoryCatalog`] are
//! the in-process versions used by the HTTP bridge and tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::*;

/// Current inventory contents.
///
/// Sampled by the update worker at execution time, never at enqueue time.
pub trait InventorySource: Send + Sync {
    /// Sum of owned quantities over `containers`.
    fn snapshot(&self, containers: &[ContainerKind]) -> Result<OwnedItems>;
}

/// Item metadata lookup.
pub trait ItemCatalog: Send + Sync {
    fn contains(&self, item_id: ItemId) -> bool;

    /// Materia details if `item_id` is a melding item.
    fn materia(&self, item_id: ItemId) -> Option<Materia>;
}

/// Inventory held in memory, one map per container.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    containers: RwLock<HashMap<ContainerKind, HashMap<ItemId, u32>>>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the full contents of one container.
    pub fn set_container(&self, kind: ContainerKind, items: HashMap<ItemId, u32>) {
        self.containers.write().insert(kind, items);
    }

    pub fn add_item(&self, kind: ContainerKind, item_id: ItemId, quantity: u32) {
        let mut containers = self.containers.write();
        let qty = containers.entry(kind).or_default().entry(item_id).or_insert(0);
        *qty = qty.saturating_add(quantity);
    }

    pub fn remove_item(&self, kind: ContainerKind, item_id: ItemId, quantity: u32) {
        let mut containers = self.containers.write();
        if let Some(items) = containers.get_mut(&kind) {
            if let Some(qty) = items.get_mut(&item_id) {
                *qty = qty.saturating_sub(quantity);
                if *qty == 0 {
                    items.remove(&item_id);
                }
            }
        }
    }

    /// Move the whole stack of `item_id` between containers.
    pub fn move_item(&self, source: ContainerKind, target: ContainerKind, item_id: ItemId) {
        let mut containers = self.containers.write();
        let Some(qty) = containers
            .get_mut(&source)
            .and_then(|items| items.remove(&item_id))
        else {
            return;
        };
        let entry = containers.entry(target).or_default().entry(item_id).or_insert(0);
        *entry = entry.saturating_add(qty);
    }
}

impl InventorySource for MemoryInventory {
    fn snapshot(&self, containers: &[ContainerKind]) -> Result<OwnedItems> {
        let held = self.containers.read();
        // Each container counts once however often it is listed.
        let kinds: HashSet<&ContainerKind> = containers.iter().collect();
        Ok(kinds
            .into_iter()
            .filter_map(|kind| held.get(kind))
            .flat_map(|items| items.iter().map(|(&id, &qty)| (id, qty)))
            .collect())
    }
}

/// On-disk shape of a [`MemoryCatalog`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub items: Vec<ItemId>,
    #[serde(default)]
    pub materia: Vec<Materia>,
}

/// Item catalog backed by explicit lists. Materia count as known items.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    items: HashSet<ItemId>,
    materia: HashMap<ItemId, Materia>,
}

impl MemoryCatalog {
    pub fn new(items: impl IntoIterator<Item = ItemId>, materia: Vec<Materia>) -> Self {
        Self {
            items: items.into_iter().collect(),
            materia: materia.into_iter().map(|m| (m.item_id, m)).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let file: CatalogFile =
            serde_json::from_str(&content).context("Failed to parse catalog file")?;
        Ok(Self::new(file.items, file.materia))
    }
}

impl ItemCatalog for MemoryCatalog {
    fn contains(&self, item_id: ItemId) -> bool {
        self.items.contains(&item_id) || self.materia.contains_key(&item_id)
    }

    fn materia(&self, item_id: ItemId) -> Option<Materia> {
        self.materia.get(&item_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_sums_tracked_containers_only() {
        let inventory = MemoryInventory::new();
        inventory.add_item(ContainerKind::Inventory1, 10, 2);
        inventory.add_item(ContainerKind::Inventory2, 10, 3);
        inventory.add_item(ContainerKind::Retainer, 10, 50);

        let owned = inventory
            .snapshot(&[ContainerKind::Inventory1, ContainerKind::Inventory2])
            .unwrap();
        assert_eq!(owned.get(10), 5);
        assert_eq!(owned.get(11), 0);
    }

    #[test]
    fn test_snapshot_counts_repeated_containers_once() {
        let inventory = MemoryInventory::new();
        inventory.add_item(ContainerKind::Inventory1, 10, 1);

        let owned = inventory
            .snapshot(&[ContainerKind::Inventory1, ContainerKind::Inventory1])
            .unwrap();
        assert_eq!(owned.get(10), 1);
    }

    #[test]
    fn test_move_and_remove() {
        let inventory = MemoryInventory::new();
        inventory.add_item(ContainerKind::Inventory1, 10, 2);
        inventory.move_item(ContainerKind::Inventory1, ContainerKind::Retainer, 10);
        assert_eq!(
            inventory.snapshot(&[ContainerKind::Inventory1]).unwrap().get(10),
            0
        );
        assert_eq!(
            inventory.snapshot(&[ContainerKind::Retainer]).unwrap().get(10),
            2
        );

        inventory.remove_item(ContainerKind::Retainer, 10, 5);
        assert!(inventory
            .snapshot(&[ContainerKind::Retainer])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_catalog_knows_materia() {
        let catalog = MemoryCatalog::new(
            [1, 2],
            vec![Materia {
                item_id: 50,
                stat: "crit".to_string(),
                tier: 10,
            }],
        );
        assert!(catalog.contains(1));
        assert!(catalog.contains(50));
        assert!(!catalog.contains(3));
        assert_eq!(catalog.materia(50).map(|m| m.tier), Some(10));
        assert!(catalog.materia(1).is_none());
    }
}
