//! Progression steps and the per-agent progression state.

use serde::{Deserialize, Serialize};

use crate::config::ProgressionConfig;

/// Phase of the paired life-cycle state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressionStep {
    /// Absorbing. Produced by unrecognized persisted step ids.
    Unknown,
    #[default]
    SearchingForPartner,
    AttemptingConception,
    Gestating,
    /// Absorbing until an external reset.
    Finished,
}

impl ProgressionStep {
    /// Stable numeric id used by the persisted record.
    pub fn id(self) -> i64 {
        match self {
            ProgressionStep::Unknown => 0,
            ProgressionStep::SearchingForPartner => 1,
            ProgressionStep::AttemptingConception => 2,
            ProgressionStep::Gestating => 3,
            ProgressionStep::Finished => 4,
        }
    }

    /// Unrecognized ids map to `Unknown`.
    pub fn from_id(id: i64) -> Self {
        match id {
            1 => ProgressionStep::SearchingForPartner,
            2 => ProgressionStep::AttemptingConception,
            3 => ProgressionStep::Gestating,
            4 => ProgressionStep::Finished,
            _ => ProgressionStep::Unknown,
        }
    }

    /// Steps the controller never advances on its own.
    pub fn is_absorbing(self) -> bool {
        matches!(self, ProgressionStep::Unknown | ProgressionStep::Finished)
    }

    /// Steps that only make sense for a married pair.
    pub fn requires_pair(self) -> bool {
        matches!(
            self,
            ProgressionStep::AttemptingConception | ProgressionStep::Gestating
        )
    }
}

/// Mutable state-machine data attached to one agent.
///
/// `child_count` is conceptually shared by a pair but stored per side; the
/// transition planners always write both sides with the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub step: ProgressionStep,
    pub cooldown_ticks: u32,
    pub is_dominant: bool,
    pub gestation_age: u32,
    pub child_count: u32,
}

impl ProgressionState {
    pub fn new(config: &ProgressionConfig) -> Self {
        Self {
            step: ProgressionStep::SearchingForPartner,
            cooldown_ticks: config.initial_cooldown_ticks,
            is_dominant: true,
            gestation_age: 0,
            child_count: 0,
        }
    }

    /// Return to defaults. `child_count` is kept: it counts children already
    /// born and only ever grows.
    pub fn reset(&mut self, config: &ProgressionConfig) {
        self.step = ProgressionStep::SearchingForPartner;
        self.cooldown_ticks = config.initial_cooldown_ticks;
        self.is_dominant = true;
        self.gestation_age = 0;
    }

    /// True when the state equals what `reset` would produce.
    pub fn is_default(&self, config: &ProgressionConfig) -> bool {
        self.step == ProgressionStep::SearchingForPartner
            && self.cooldown_ticks == config.initial_cooldown_ticks
            && self.is_dominant
            && self.gestation_age == 0
    }
}
