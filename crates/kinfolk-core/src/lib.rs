//! Kinfolk Core - Paired Life-Cycle Progression Engine
//!
//! An ECS-based simulation of villagers who court, marry, have children and
//! raise them, tick by tick, without player involvement. The hard part is
//! the pair: two independently stored agents that must move through the
//! same story in lockstep, survive save/load and partial unloading, and
//! never disagree about who drives the next step.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Villagers
//! - **Components**: Pure data attached to entities (Villager, Marriage, Behaviors, etc.)
//! - **Systems**: Logic that queries and updates components
//!
//! Rules that need no world access (gates, transition planning, invariants)
//! live in `kinfolk-logic`; this crate resolves mates, commits outcomes and
//! owns persistence.
//!
//! # Example
//!
//! ```rust,no_run
//! use kinfolk_core::prelude::*;
//! use kinfolk_core::generation::VillageConfig;
//!
//! let mut engine = SimulationEngine::new(ProgressionConfig::default(), 42);
//!
//! // Generate a village
//! engine.generate(&VillageConfig::default());
//!
//! // Run simulation
//! loop {
//!     engine.tick();
//!     for event in engine.drain_events() {
//!         println!("{event:?}");
//!     }
//! }
//! ```

pub mod components;
pub mod engine;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod registry;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::SimulationEngine;
    pub use crate::error::ProgressionError;
    pub use crate::systems::VillagerSpec;
    pub use kinfolk_logic::config::{InvariantMode, ProgressionConfig, SiblingRule};
    pub use kinfolk_logic::events::LifeEvent;
    pub use kinfolk_logic::progression::{ProgressionState, ProgressionStep};
}
