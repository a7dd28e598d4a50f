//! Meld plan generation.
//!
//! The game fills melding slots strictly in order, so a plan is always a
//! prefix of a piece's slots: generation stops at the first slot the owned
//! materia cannot fill instead of skipping ahead.

use crate::inventory::ItemCatalog;
use crate::models::*;

/// Owned materia with remaining counts.
#[derive(Debug, Clone, Default)]
pub struct MateriaPool {
    // Sorted by stat, then tier descending.
    entries: Vec<(Materia, u32)>,
}

impl MateriaPool {
    pub fn new(materia: impl IntoIterator<Item = (Materia, u32)>) -> Self {
        let mut entries: Vec<(Materia, u32)> =
            materia.into_iter().filter(|(_, count)| *count > 0).collect();
        entries.sort_by(|(a, _), (b, _)| {
            a.stat
                .cmp(&b.stat)
                .then(b.tier.cmp(&a.tier))
                .then(a.item_id.cmp(&b.item_id))
        });
        Self { entries }
    }

    /// Materia among `owned` items, as identified by `catalog`.
    pub fn from_owned(owned: &OwnedItems, catalog: &dyn ItemCatalog) -> Self {
        Self::new(
            owned
                .iter()
                .filter_map(|(id, qty)| catalog.materia(id).map(|m| (m, qty))),
        )
    }

    pub fn remaining(&self, item_id: ItemId) -> u32 {
        self.entries
            .iter()
            .find(|(m, _)| m.item_id == item_id)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Take one of the highest-tier `stat` materia within `min..=max`.
    fn take(&mut self, stat: &str, min: u8, max: u8) -> Option<Materia> {
        let (materia, count) = self
            .entries
            .iter_mut()
            .find(|(m, count)| *count > 0 && m.stat == stat && m.tier >= min && m.tier <= max)?;
        *count -= 1;
        Some(materia.clone())
    }
}

/// Plan one gearpiece, consuming from `pool`.
pub fn plan_gearpiece(piece: &Gearpiece, pool: &mut MateriaPool, strategy: MeldStrategy) -> MeldPlan {
    let overmeld = strategy == MeldStrategy::Overmeld;
    let mut assignments = Vec::with_capacity(piece.melds.len());

    for (slot_index, slot) in piece.melds.iter().enumerate() {
        match pool.take(&slot.stat, slot.tier, slot.ceiling(overmeld)) {
            Some(materia) => assignments.push(MeldAssignment {
                slot_index,
                materia,
            }),
            None => break,
        }
    }

    MeldPlan {
        slot: piece.slot,
        assignments,
        slot_count: piece.melds.len(),
    }
}

/// Plan every piece of a gearset in order from one shared pool.
pub fn plan_gearset(gearset: &Gearset, pool: &MateriaPool, strategy: MeldStrategy) -> GearsetMeldPlan {
    let mut pool = pool.clone();
    GearsetMeldPlan {
        strategy,
        pieces: gearset
            .pieces
            .iter()
            .filter(|piece| !piece.melds.is_empty())
            .map(|piece| plan_gearpiece(piece, &mut pool, strategy))
            .collect(),
    }
}

/// The alternative plans offered for a gearset, preferred strategy first.
/// An alternative identical to an earlier one is dropped.
pub fn plans_for_gearset(
    gearset: &Gearset,
    pool: &MateriaPool,
    prefer_overmeld: bool,
) -> Vec<GearsetMeldPlan> {
    let order = if prefer_overmeld {
        [MeldStrategy::Overmeld, MeldStrategy::Exact]
    } else {
        [MeldStrategy::Exact, MeldStrategy::Overmeld]
    };

    let mut plans: Vec<GearsetMeldPlan> = Vec::with_capacity(order.len());
    for strategy in order {
        let plan = plan_gearset(gearset, pool, strategy);
        if !plans.iter().any(|p| p.pieces == plan.pieces) {
            plans.push(plan);
        }
    }
    plans
}
