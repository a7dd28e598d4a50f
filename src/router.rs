//! Inventory event filtering.
//!
//! Decides cheaply whether an inventory notification can change any
//! collected state. Only a positive decision leads to a recompute, and the
//! recompute itself always runs on the update queue.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::TrackerConfig;
use crate::models::*;
use crate::resolver::gearsets_need_item;

/// Net effect of an event on tracked holdings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Addition,
    Removal,
    /// Quantity changed in place; may go either way.
    InPlace,
}

/// What to do with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    /// Automatic scanning is off.
    Disabled,
    /// No net change in tracked containers.
    Untracked,
    /// Tracked change, but no gearset cares about the item.
    Irrelevant,
    Recompute,
}

#[derive(Debug, Clone)]
pub struct InventoryRouter {
    tracked: HashSet<ContainerKind>,
    auto_scan: bool,
}

impl InventoryRouter {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            tracked: config.tracked_containers.iter().copied().collect(),
            auto_scan: config.auto_scan,
        }
    }

    pub fn is_tracked(&self, kind: ContainerKind) -> bool {
        self.tracked.contains(&kind)
    }

    /// Net change in tracked holdings, if any.
    ///
    /// Moves within tracked containers, or within untracked ones, are no
    /// change at all.
    pub fn classify(&self, event: &InventoryEvent) -> Option<Change> {
        match *event {
            InventoryEvent::Added { container, .. } => {
                self.is_tracked(container).then_some(Change::Addition)
            }
            InventoryEvent::Removed { container, .. } => {
                self.is_tracked(container).then_some(Change::Removal)
            }
            InventoryEvent::Changed { container, .. } => {
                self.is_tracked(container).then_some(Change::InPlace)
            }
            InventoryEvent::Moved { source, target, .. } => {
                match (self.is_tracked(source), self.is_tracked(target)) {
                    (false, true) => Some(Change::Addition),
                    (true, false) => Some(Change::Removal),
                    _ => None,
                }
            }
        }
    }

    pub fn route(&self, event: &InventoryEvent, gearsets: &[Gearset]) -> Routing {
        if !self.auto_scan {
            return Routing::Disabled;
        }
        let Some(change) = self.classify(event) else {
            return Routing::Untracked;
        };

        // Removals must look at satisfied demand too: losing an item can
        // flip a collected atom back.
        let include_collected = change != Change::Addition;
        if gearsets_need_item(event.item_id(), gearsets, false, include_collected) {
            Routing::Recompute
        } else {
            Routing::Irrelevant
        }
    }
}
