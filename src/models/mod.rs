//! Domain models for the gearset tracker.
//!
//! # Core Concepts
//!
//! - [`Gearset`]: a named set of [`Gearpiece`]s for one job, the unit the user
//!   imports, activates and deletes.
//! - [`Gearpiece`]: one equipment slot, its end-state item and a
//!   [`PrerequisiteNode`] tree describing how that item can be obtained.
//! - [`PrerequisiteNode`]: a closed sum of atoms (one item in a quantity),
//!   `AllOf` groups and `OneOf` alternatives, each with a derived
//!   `collected` flag and a manual lock.
//! - [`MeldSlot`] / [`MeldPlan`]: melding requirements of a piece and the
//!   ordered materia assignments generated for them.
//! - [`InventoryEvent`] / [`OwnedItems`]: what the game client reports and
//!   the quantity snapshot resolution runs against.

mod gearset;
mod inventory;
mod materia;
mod prerequisite;

pub use gearset::*;
pub use inventory::*;
pub use materia::*;
pub use prerequisite::*;
