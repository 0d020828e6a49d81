//! Identity and record-level enums shared by every crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable villager identity. Survives serialization and unloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VillagerId(pub u64);

impl VillagerId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VillagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn opposite(self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }

    pub fn random(rng: &mut impl rand::Rng) -> Self {
        if rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaritalStatus {
    #[default]
    Single,
    Engaged,
    Married,
}

impl MaritalStatus {
    /// Engaged and married villagers are off the market for partner search.
    pub fn is_taken(self) -> bool {
        !matches!(self, MaritalStatus::Single)
    }
}
