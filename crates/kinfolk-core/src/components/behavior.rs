//! Behavior table: per-villager behavior state keyed by behavior kind.
//!
//! Systems look up the slot they own by [`BehaviorKind`] instead of fetching
//! a component by type, so new behaviors add a kind and a state variant
//! without new component types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use kinfolk_logic::progression::ProgressionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BehaviorKind {
    /// Courtship, marriage and family progression.
    Progression,
    /// Work assignment owned by the chore subsystem.
    Chore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorState {
    Progression(ProgressionState),
    Chore(ChoreSlot),
}

impl BehaviorState {
    pub fn kind(&self) -> BehaviorKind {
        match self {
            BehaviorState::Progression(_) => BehaviorKind::Progression,
            BehaviorState::Chore(_) => BehaviorKind::Chore,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoreKind {
    Farming,
    Mining,
    Woodcutting,
    Hunting,
    Cooking,
}

/// Opaque chore assignment. The engine stores and persists it; scheduling
/// belongs to the chore subsystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoreSlot {
    pub chore: Option<ChoreKind>,
    pub active: bool,
}

/// Behavior-kind to behavior-state table attached to every villager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Behaviors {
    slots: BTreeMap<BehaviorKind, BehaviorState>,
}

impl Behaviors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, state: BehaviorState) -> Self {
        self.insert(state);
        self
    }

    /// Insert or replace the slot for `state.kind()`.
    pub fn insert(&mut self, state: BehaviorState) -> Option<BehaviorState> {
        self.slots.insert(state.kind(), state)
    }

    pub fn get(&self, kind: BehaviorKind) -> Option<&BehaviorState> {
        self.slots.get(&kind)
    }

    pub fn remove(&mut self, kind: BehaviorKind) -> Option<BehaviorState> {
        self.slots.remove(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = BehaviorKind> + '_ {
        self.slots.keys().copied()
    }

    pub fn progression(&self) -> Option<&ProgressionState> {
        match self.slots.get(&BehaviorKind::Progression) {
            Some(BehaviorState::Progression(state)) => Some(state),
            _ => None,
        }
    }

    pub fn progression_mut(&mut self) -> Option<&mut ProgressionState> {
        match self.slots.get_mut(&BehaviorKind::Progression) {
            Some(BehaviorState::Progression(state)) => Some(state),
            _ => None,
        }
    }

    pub fn chore(&self) -> Option<&ChoreSlot> {
        match self.slots.get(&BehaviorKind::Chore) {
            Some(BehaviorState::Chore(slot)) => Some(slot),
            _ => None,
        }
    }
}
