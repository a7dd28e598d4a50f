//! Gearset tracking engine.
//!
//! Keeps a player's desired gearsets reconciled against live inventory:
//! prerequisite trees are resolved on a single-writer update queue whenever
//! a relevant inventory change is reported, and meld plans are generated
//! from owned materia on demand.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod inventory;
pub mod meld;
pub mod models;
pub mod queue;
pub mod render;
pub mod resolver;
pub mod router;
pub mod store;
pub mod tracker;

pub use error::{Result, TrackerError};
pub use tracker::{Tracker, TrackerBuilder};
