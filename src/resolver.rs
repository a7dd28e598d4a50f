//! Collected-state resolution for prerequisite trees.
//!
//! [`resolve`] walks a tree depth-first, post-order, against a snapshot of
//! owned quantities and rewrites every unlocked node's state in place.
//! Running it twice against the same snapshot leaves the tree unchanged.

use std::collections::BTreeMap;

use crate::models::*;

/// Recompute `node` and its subtree against `owned`.
///
/// - Locked atoms are skipped entirely.
/// - Unlocked atoms take `owned[item_id]` and are collected once it reaches
///   the required quantity.
/// - `AllOf` is collected when every child is; `OneOf` when any child is.
/// - Locked groups still resolve their children but keep their own
///   collected flag and active alternative.
pub fn resolve(node: &mut PrerequisiteNode, owned: &OwnedItems) {
    let locked = node.locked;
    let collected = match &mut node.kind {
        NodeKind::Atom {
            item_id,
            required,
            owned: seen,
        } => {
            if locked {
                return;
            }
            *seen = owned.get(*item_id);
            *seen >= *required
        }
        NodeKind::AllOf { children } => {
            for child in children.iter_mut() {
                resolve(child, owned);
            }
            children.iter().all(|c| c.collected)
        }
        NodeKind::OneOf { children, active } => {
            for child in children.iter_mut() {
                resolve(child, owned);
            }
            if !locked {
                *active = choose_active(children);
            }
            children.iter().any(|c| c.collected)
        }
    };

    if !locked {
        node.collected = collected;
    }
}

/// Resolve a gearpiece's tree and mirror the root onto the piece unless the
/// piece itself is locked.
pub fn resolve_gearpiece(piece: &mut Gearpiece, owned: &OwnedItems) {
    resolve(&mut piece.root, owned);
    if !piece.locked {
        piece.collected = piece.root.collected;
    }
}

pub fn resolve_gearset(gearset: &mut Gearset, owned: &OwnedItems) {
    for piece in &mut gearset.pieces {
        resolve_gearpiece(piece, owned);
    }
}

/// Pick the alternative shown as the active path of a `OneOf`.
///
/// A collected child wins, the one with the fewest atoms first. Otherwise
/// the child with the highest share of collected atoms. Ties go to the
/// earlier child.
pub fn choose_active(children: &[PrerequisiteNode]) -> Option<usize> {
    let simplest_collected = children
        .iter()
        .enumerate()
        .filter(|(_, child)| child.collected)
        .min_by_key(|(_, child)| child.atom_count())
        .map(|(i, _)| i);
    if simplest_collected.is_some() {
        return simplest_collected;
    }

    let mut best: Option<(usize, usize, usize)> = None;
    for (i, child) in children.iter().enumerate() {
        let got = child.collected_atom_count();
        let total = child.atom_count().max(1);
        let better = match best {
            None => true,
            // got / total > best_got / best_total
            Some((_, best_got, best_total)) => got * best_total > best_got * total,
        };
        if better {
            best = Some((i, got, total));
        }
    }
    best.map(|(i, _, _)| i)
}

/// Whether any gearset still has demand for `item_id`.
///
/// Only active gearsets are considered unless `ignore_collected` is set, in
/// which case inactive ones are searched too. Collected atoms are skipped
/// unless `include_collected_prereqs` is set: additions only matter for
/// unsatisfied demand, while a removal can flip a satisfied atom back.
///
/// Unlike a plain "any matching uncollected atom" test, locked atoms are
/// deliberately excluded: resolution never rewrites them, so an event for
/// their item cannot change any state and must not enqueue a recompute.
pub fn gearsets_need_item(
    item_id: ItemId,
    gearsets: &[Gearset],
    ignore_collected: bool,
    include_collected_prereqs: bool,
) -> bool {
    gearsets
        .iter()
        .filter(|g| g.is_active || ignore_collected)
        .flat_map(|g| &g.pieces)
        .any(|piece| node_needs_item(&piece.root, item_id, include_collected_prereqs))
}

fn node_needs_item(node: &PrerequisiteNode, item_id: ItemId, include_collected: bool) -> bool {
    match node.kind {
        NodeKind::Atom { item_id: id, .. } => {
            id == item_id && !node.locked && (include_collected || !node.collected)
        }
        _ => node
            .children()
            .iter()
            .any(|child| node_needs_item(child, item_id, include_collected)),
    }
}

/// Atom progress along the active path of a tree.
///
/// `AllOf` counts every child, `OneOf` only its active (or first)
/// alternative. A collected node counts its whole path as collected.
pub fn node_progress(node: &PrerequisiteNode) -> Progress {
    let progress = match &node.kind {
        NodeKind::Atom { .. } => Progress {
            collected: usize::from(node.collected),
            total: 1,
        },
        NodeKind::AllOf { children } => children
            .iter()
            .map(node_progress)
            .fold(Progress::default(), |acc, p| acc + p),
        NodeKind::OneOf { children, active } => active
            .and_then(|i| children.get(i))
            .or_else(|| children.first())
            .map(node_progress)
            .unwrap_or_default(),
    };

    if node.collected {
        Progress {
            collected: progress.total,
            total: progress.total,
        }
    } else {
        progress
    }
}

pub fn gearpiece_progress(piece: &Gearpiece) -> Progress {
    let progress = node_progress(&piece.root);
    if piece.collected {
        Progress {
            collected: progress.total,
            total: progress.total,
        }
    } else {
        progress
    }
}

pub fn gearset_progress(gearset: &Gearset) -> GearsetProgress {
    let pieces: Vec<GearpieceProgress> = gearset
        .pieces
        .iter()
        .map(|piece| GearpieceProgress {
            slot: piece.slot,
            collected: piece.collected,
            progress: gearpiece_progress(piece),
        })
        .collect();

    GearsetProgress {
        gearset_id: gearset.id,
        collected: gearset.is_collected(),
        progress: pieces
            .iter()
            .fold(Progress::default(), |acc, p| acc + p.progress),
        pieces,
    }
}

/// Outstanding quantities per item over active gearsets, following each
/// `OneOf`'s active path. Sorted by item id.
pub fn needed_items(gearsets: &[Gearset]) -> Vec<NeededItem> {
    let mut needed: BTreeMap<ItemId, NeededItem> = BTreeMap::new();
    for piece in gearsets
        .iter()
        .filter(|g| g.is_active)
        .flat_map(|g| &g.pieces)
        .filter(|p| !p.collected)
    {
        collect_needed(&piece.root, &mut needed);
    }
    needed
        .into_values()
        .filter(|item| item.required > item.owned)
        .collect()
}

fn collect_needed(node: &PrerequisiteNode, needed: &mut BTreeMap<ItemId, NeededItem>) {
    if node.collected {
        return;
    }
    match &node.kind {
        NodeKind::Atom {
            item_id,
            required,
            owned,
        } => {
            if node.locked {
                return;
            }
            let entry = needed.entry(*item_id).or_insert(NeededItem {
                item_id: *item_id,
                required: 0,
                owned: 0,
            });
            entry.required = entry.required.saturating_add(*required);
            entry.owned = entry.owned.max(*owned);
        }
        NodeKind::AllOf { children } => {
            for child in children {
                collect_needed(child, needed);
            }
        }
        NodeKind::OneOf { children, active } => {
            if let Some(child) = active.and_then(|i| children.get(i)).or_else(|| children.first()) {
                collect_needed(child, needed);
            }
        }
    }
}
