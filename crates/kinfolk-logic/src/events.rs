//! Life events emitted by the progression engine.
//!
//! Events are notifications for presentation layers (particles, sounds, UI
//! prompts). Nothing in the engine depends on them being consumed.

use serde::{Deserialize, Serialize};

use crate::ids::VillagerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeEvent {
    PartnerFound {
        tick: u64,
        a: VillagerId,
        b: VillagerId,
    },
    ConceptionSucceeded {
        tick: u64,
        carrier: VillagerId,
        partner: VillagerId,
    },
    ChildBorn {
        tick: u64,
        carrier: VillagerId,
        partner: VillagerId,
        child: VillagerId,
    },
}

impl LifeEvent {
    pub fn tick(&self) -> u64 {
        match self {
            LifeEvent::PartnerFound { tick, .. }
            | LifeEvent::ConceptionSucceeded { tick, .. }
            | LifeEvent::ChildBorn { tick, .. } => *tick,
        }
    }

    /// The two agents of the pair involved.
    pub fn pair(&self) -> (VillagerId, VillagerId) {
        match *self {
            LifeEvent::PartnerFound { a, b, .. } => (a, b),
            LifeEvent::ConceptionSucceeded { carrier, partner, .. }
            | LifeEvent::ChildBorn { carrier, partner, .. } => (carrier, partner),
        }
    }

    pub fn involves(&self, id: VillagerId) -> bool {
        let (a, b) = self.pair();
        a == id || b == id
    }
}
