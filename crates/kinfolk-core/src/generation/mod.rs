//! Generation - procedural creation of villages and names

mod names;
mod village;

pub use names::*;
pub use village::*;
