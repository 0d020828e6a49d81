//! Systems - logic that operates on components

mod audit;
mod lifecycle;
mod mate;
mod maturity;
mod progression;

pub use audit::*;
pub use lifecycle::*;
pub use mate::*;
pub use maturity::*;
pub use progression::progression_system;
pub(crate) use progression::store_progression;
