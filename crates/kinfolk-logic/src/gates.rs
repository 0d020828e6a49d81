//! Controller gates: decides, once per tick and agent, whether a transition
//! handler runs.
//!
//! Gates run in a fixed order: master switch, childhood, activation
//! threshold, dominance, cooldown, probability. Only the cooldown and
//! probability gates mutate the state (the cooldown counter).

use rand::Rng;

use crate::config::ProgressionConfig;
use crate::progression::{ProgressionState, ProgressionStep};

/// Agent Record facts the gates need.
#[derive(Debug, Clone, Copy)]
pub struct AgentClock {
    pub ticks_alive: u64,
    pub is_child: bool,
}

/// Outcome of running the gates for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Progression is switched off in the config.
    Disabled,
    /// Children are inert.
    Child,
    /// Not yet past the activation threshold.
    Dormant,
    /// Passive side of a pair; only the dominant side acts.
    Passive,
    /// Cooldown was decremented; `remaining` is the new value.
    CoolingDown { remaining: u32 },
    /// Cooldown expired and was reset, but the probability roll failed.
    Declined,
    /// Dispatch to the handler for this step.
    Act(ProgressionStep),
}

/// Roll a percent chance. 100 always passes, 0 never does.
pub fn roll_percent(rng: &mut impl Rng, percent: u8) -> bool {
    rng.gen_range(0..100u32) < u32::from(percent)
}

/// Run every gate in order for one tick.
pub fn run_gates(
    state: &mut ProgressionState,
    clock: AgentClock,
    config: &ProgressionConfig,
    rng: &mut impl Rng,
) -> Gate {
    if !config.enabled {
        return Gate::Disabled;
    }
    if clock.is_child {
        return Gate::Child;
    }
    if clock.ticks_alive < config.activation_threshold_ticks() {
        return Gate::Dormant;
    }
    if !state.is_dominant {
        return Gate::Passive;
    }
    if state.cooldown_ticks > 0 {
        state.cooldown_ticks -= 1;
        return Gate::CoolingDown {
            remaining: state.cooldown_ticks,
        };
    }

    state.cooldown_ticks = config.evaluation_interval_ticks();

    if roll_percent(rng, config.action_probability_percent) {
        Gate::Act(state.step)
    } else {
        Gate::Declined
    }
}
