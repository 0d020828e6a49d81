//! Component definitions for the ECS simulation.
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in systems.

mod behavior;
mod common;
mod villager;

pub use behavior::*;
pub use common::*;
pub use villager::*;
