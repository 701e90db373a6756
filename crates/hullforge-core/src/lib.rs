//! HullForge Core - Modular Ship Structure Engine
//!
//! Ships are built from rectangular parts snapped onto an integer grid.
//! The core keeps track of which cell belongs to which part, which parts
//! touch, how resources are pooled across touching parts, and what force a
//! ship produces each tick. When parts are destroyed it notices that a ship
//! has come apart and splits it into independent vessels.
//!
//! # Architecture
//!
//! Vessels live in an ECS world via `hecs`:
//! - **Entities**: one per vessel
//! - **Components**: [`vessel::Vessel`] (parts, field, resource pools) and
//!   [`systems::RigidBody`]
//! - **Systems**: propulsion, physics hand-off and destruction, run in that
//!   order every tick
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use glam::Vec2;
//! use hullforge_core::prelude::*;
//!
//! let catalog = std::fs::read_to_string("data/parts.json").unwrap();
//! let catalog = Arc::new(PartCatalog::from_json(&catalog).unwrap());
//! let layout = std::fs::read_to_string("data/layouts/dumbbell.json").unwrap();
//! let layout = layout_from_json(&layout).unwrap();
//!
//! let mut engine = SimulationEngine::new(catalog);
//! engine.spawn_layout(&layout, Vec2::ZERO).unwrap();
//!
//! loop {
//!     engine.update(1.0 / 60.0, &ControlInputs::new()); // 60 FPS
//! }
//! ```

pub mod assembly;
pub mod catalog;
pub mod components;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod field;
pub mod graph;
pub mod persistence;
pub mod systems;
pub mod vessel;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::assembly::{Assembly, ReleaseOutcome};
    pub use crate::catalog::PartCatalog;
    pub use crate::components::*;
    pub use crate::config::EngineConfig;
    pub use crate::editor::Blueprint;
    pub use crate::engine::SimulationEngine;
    pub use crate::error::PreconditionError;
    pub use crate::field::OccupancyField;
    pub use crate::persistence::{layout_from_json, LoadMode, SaveError, ShipLayout};
    pub use crate::systems::{DestructionEvent, RigidBody};
    pub use crate::vessel::Vessel;
}
