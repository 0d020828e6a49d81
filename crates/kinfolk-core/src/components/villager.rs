//! Agent Record components: who a villager is and whom they are bound to.

use serde::{Deserialize, Serialize};

pub use kinfolk_logic::ids::{Gender, MaritalStatus, VillagerId};
pub use kinfolk_logic::kinship::Parentage;

/// Core record of a villager. Every simulated NPC has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Villager {
    pub id: VillagerId,
    pub gender: Gender,
    /// Progression is inert while true.
    pub is_child: bool,
    /// Ticks since creation or since the last lifecycle reset.
    pub ticks_alive: u64,
}

impl Villager {
    pub fn adult(id: VillagerId, gender: Gender) -> Self {
        Self {
            id,
            gender,
            is_child: false,
            ticks_alive: 0,
        }
    }

    pub fn child(id: VillagerId, gender: Gender) -> Self {
        Self {
            is_child: true,
            ..Self::adult(id, gender)
        }
    }
}

/// Marital status and spouse reference.
///
/// `spouse` is only meaningful while not single. It may go stale when the
/// spouse is removed; the mate resolver treats that as an unavailable mate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marriage {
    pub status: MaritalStatus,
    pub spouse: Option<VillagerId>,
}

impl Marriage {
    pub fn married_to(spouse: VillagerId) -> Self {
        Self {
            status: MaritalStatus::Married,
            spouse: Some(spouse),
        }
    }

    pub fn engaged_to(spouse: VillagerId) -> Self {
        Self {
            status: MaritalStatus::Engaged,
            spouse: Some(spouse),
        }
    }

    /// Spouse id if not single.
    pub fn partner(&self) -> Option<VillagerId> {
        if self.status.is_taken() {
            self.spouse
        } else {
            None
        }
    }

    pub fn is_married_to(&self, id: VillagerId) -> bool {
        self.status == MaritalStatus::Married && self.spouse == Some(id)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Present on the carrying villager between conception and birth.
/// The child's gender is decided at conception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrying {
    pub child_gender: Gender,
}
