//! The ordered gearset collection and its model operations.
//!
//! [`GearsetStore`] is plain data: it is shared behind a lock by the
//! tracker and only mutated from update-queue jobs.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::inventory::ItemCatalog;
use crate::models::*;
use crate::resolver;

/// Deepest prerequisite tree accepted at import.
pub const MAX_TREE_DEPTH: usize = 16;

/// Largest quantity a single atom may require (the game's currency cap).
pub const MAX_REQUIRED_QUANTITY: u32 = 999_999_999;

/// Which gearsets a recompute touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeScope {
    /// Active gearsets only (automatic, event-driven updates).
    Active,
    /// Every gearset (manual rescans and login).
    All,
}

#[derive(Debug, Clone)]
pub struct GearsetStore {
    gearsets: Vec<Gearset>,
    max_gearsets: usize,
    next_position: u32,
}

impl GearsetStore {
    pub fn new(max_gearsets: usize) -> Self {
        Self {
            gearsets: Vec::new(),
            max_gearsets,
            next_position: 0,
        }
    }

    /// Rebuild from persisted gearsets, keeping their creation order.
    pub fn with_gearsets(max_gearsets: usize, mut gearsets: Vec<Gearset>) -> Self {
        gearsets.sort_by_key(|g| g.position);
        let next_position = gearsets.last().map(|g| g.position + 1).unwrap_or(0);
        Self {
            gearsets,
            max_gearsets,
            next_position,
        }
    }

    /// Gearsets in creation order.
    pub fn gearsets(&self) -> &[Gearset] {
        &self.gearsets
    }

    pub fn len(&self) -> usize {
        self.gearsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gearsets.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Gearset> {
        self.gearsets.iter().find(|g| g.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Gearset> {
        self.gearsets
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(TrackerError::GearsetNotFound(id))
    }

    /// Validate `definition` and append it as a new gearset.
    pub fn import(
        &mut self,
        definition: GearsetDefinition,
        catalog: Option<&dyn ItemCatalog>,
    ) -> Result<Uuid> {
        validate_definition(&definition, catalog)?;
        self.ensure_capacity()?;

        let now = Utc::now();
        let gearset = Gearset {
            id: Uuid::new_v4(),
            name: definition.name.trim().to_string(),
            job: definition.job,
            is_active: definition.is_active.unwrap_or(true),
            position: self.next_position,
            pieces: definition
                .pieces
                .into_iter()
                .map(|piece| Gearpiece {
                    slot: piece.slot,
                    item_id: piece.item_id,
                    name: piece.name,
                    root: piece
                        .prerequisites
                        .map(reset_state)
                        .unwrap_or_else(|| PrerequisiteNode::atom(piece.item_id, 1)),
                    collected: false,
                    locked: false,
                    melds: piece.melds,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        };

        let id = gearset.id;
        self.next_position += 1;
        self.gearsets.push(gearset);
        Ok(id)
    }

    fn ensure_capacity(&self) -> Result<()> {
        if self.gearsets.len() >= self.max_gearsets {
            return Err(TrackerError::TooManyGearsets {
                max: self.max_gearsets,
            });
        }
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Gearset> {
        let index = self
            .gearsets
            .iter()
            .position(|g| g.id == id)
            .ok_or(TrackerError::GearsetNotFound(id))?;
        Ok(self.gearsets.remove(index))
    }

    /// Change activation. Does not recompute anything.
    pub fn set_active(&mut self, id: Uuid, is_active: bool) -> Result<()> {
        let gearset = self.get_mut(id)?;
        gearset.is_active = is_active;
        gearset.updated_at = Utc::now();
        Ok(())
    }

    /// Set or clear a lock on a gearpiece or one node of its tree.
    ///
    /// Locks never cascade: locking a root leaves its children unlocked.
    pub fn set_lock(&mut self, id: Uuid, slot: EquipSlot, input: SetLockInput) -> Result<()> {
        let gearset = self.get_mut(id)?;
        let piece = gearset
            .pieces
            .iter_mut()
            .find(|p| p.slot == slot)
            .ok_or(TrackerError::GearpieceNotFound {
                gearset_id: id,
                slot,
            })?;

        match input.path {
            None => {
                if let Some(collected) = input.collected {
                    piece.collected = collected;
                }
                piece.locked = input.locked;
            }
            Some(path) => {
                let node = piece
                    .root
                    .node_mut(&path)
                    .ok_or_else(|| TrackerError::NodeNotFound { path: path.clone() })?;
                if let Some(collected) = input.collected {
                    node.collected = collected;
                }
                node.locked = input.locked;
            }
        }

        gearset.updated_at = Utc::now();
        Ok(())
    }

    /// Resolve gearsets in `scope` against `owned`. Returns whether any
    /// gearset's state changed.
    pub fn resolve(&mut self, owned: &OwnedItems, scope: RecomputeScope) -> bool {
        let mut changed = false;
        for gearset in self
            .gearsets
            .iter_mut()
            .filter(|g| scope == RecomputeScope::All || g.is_active)
        {
            let before = gearset.pieces.clone();
            resolver::resolve_gearset(gearset, owned);
            if gearset.pieces != before {
                gearset.updated_at = Utc::now();
                changed = true;
            }
        }
        changed
    }

    pub fn clear(&mut self) {
        self.gearsets.clear();
        self.next_position = 0;
    }
}

/// Check an import blob before anything is built from it.
pub fn validate_definition(
    definition: &GearsetDefinition,
    catalog: Option<&dyn ItemCatalog>,
) -> Result<()> {
    if definition.name.trim().is_empty() {
        return Err(invalid("gearset name is empty"));
    }
    if definition.pieces.is_empty() {
        return Err(invalid("gearset has no gearpieces"));
    }

    let mut slots = HashSet::new();
    for piece in &definition.pieces {
        if !slots.insert(piece.slot) {
            return Err(invalid(format!("slot {} appears twice", piece.slot.as_str())));
        }
        check_known(piece.item_id, catalog)?;

        if let Some(root) = &piece.prerequisites {
            if root.depth() > MAX_TREE_DEPTH {
                return Err(invalid(format!(
                    "prerequisites for {} nest deeper than {}",
                    piece.slot.as_str(),
                    MAX_TREE_DEPTH
                )));
            }
            validate_node(root, catalog)?;
        }

        for (index, meld) in piece.melds.iter().enumerate() {
            if meld.tier == 0 {
                return Err(invalid(format!(
                    "meld slot {} on {} has tier 0",
                    index,
                    piece.slot.as_str()
                )));
            }
            if meld.max_tier.is_some_and(|max| max < meld.tier) {
                return Err(invalid(format!(
                    "meld slot {} on {} caps below its tier",
                    index,
                    piece.slot.as_str()
                )));
            }
        }
    }
    Ok(())
}

fn validate_node(node: &PrerequisiteNode, catalog: Option<&dyn ItemCatalog>) -> Result<()> {
    match &node.kind {
        NodeKind::Atom {
            item_id, required, ..
        } => {
            if *required == 0 {
                return Err(invalid(format!("item {} is required 0 times", item_id)));
            }
            if *required > MAX_REQUIRED_QUANTITY {
                return Err(invalid(format!(
                    "item {} is required {} times, above the limit of {}",
                    item_id, required, MAX_REQUIRED_QUANTITY
                )));
            }
            check_known(*item_id, catalog)
        }
        NodeKind::AllOf { children } | NodeKind::OneOf { children, .. } => {
            if children.is_empty() {
                return Err(invalid("empty prerequisite group"));
            }
            children.iter().try_for_each(|c| validate_node(c, catalog))
        }
    }
}

fn check_known(item_id: ItemId, catalog: Option<&dyn ItemCatalog>) -> Result<()> {
    match catalog {
        Some(catalog) if !catalog.contains(item_id) => Err(TrackerError::UnknownItem(item_id)),
        _ => Ok(()),
    }
}

fn invalid(msg: impl Into<String>) -> TrackerError {
    TrackerError::InvalidDefinition(msg.into())
}

/// Strip any collected/lock state carried in by an import blob.
fn reset_state(mut node: PrerequisiteNode) -> PrerequisiteNode {
    node.collected = false;
    node.locked = false;
    node.kind = match node.kind {
        NodeKind::Atom {
            item_id, required, ..
        } => NodeKind::Atom {
            item_id,
            required,
            owned: 0,
        },
        NodeKind::AllOf { children } => NodeKind::AllOf {
            children: children.into_iter().map(reset_state).collect(),
        },
        NodeKind::OneOf { children, .. } => NodeKind::OneOf {
            children: children.into_iter().map(reset_state).collect(),
            active: None,
        },
    };
    node
}
