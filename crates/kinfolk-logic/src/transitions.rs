//! Transition planning for the paired steps.
//!
//! Every planner takes the current state of both sides and returns the full
//! resulting state of both sides, dominance included. Nothing here touches
//! an entity store: the engine resolves the mate, calls a planner and commits
//! the returned [`PairOutcome`] to both agents inside the same tick.
//!
//! Cooldowns are never changed by a planner.

use rand::Rng;

use crate::config::ProgressionConfig;
use crate::gates::roll_percent;
use crate::ids::Gender;
use crate::progression::{ProgressionState, ProgressionStep};

/// One half of a pair, from the point of view of the acting agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Actor,
    Mate,
}

/// Resulting state of both sides after a transition. `mate` is `None` when
/// the transition ran without a resolvable mate (birth only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairOutcome {
    pub actor: ProgressionState,
    pub mate: Option<ProgressionState>,
}

/// The side that drives a freshly formed pair: the male side. A same-gender
/// pair keeps the actor in charge.
pub fn pairing_driver(actor: Gender, mate: Gender) -> Side {
    match (actor, mate) {
        (Gender::Female, Gender::Male) => Side::Mate,
        _ => Side::Actor,
    }
}

/// The side that carries the child: the female side. A same-gender pair
/// falls back to the mate.
pub fn carrying_side(actor: Gender, mate: Gender) -> Side {
    match (actor, mate) {
        (Gender::Female, Gender::Male) => Side::Actor,
        _ => Side::Mate,
    }
}

fn with_dominance(
    actor: ProgressionState,
    mate: ProgressionState,
    dominant: Side,
) -> PairOutcome {
    let mut actor = actor;
    let mut mate = mate;
    actor.is_dominant = dominant == Side::Actor;
    mate.is_dominant = dominant == Side::Mate;
    PairOutcome {
        actor,
        mate: Some(mate),
    }
}

/// Partner found (or an externally arranged spouse picked up): both sides
/// move to AttemptingConception and the male side drives.
///
/// The pair's child count starts at the larger of the two, so both sides
/// agree and neither side's history is lost.
pub fn plan_pairing(
    actor: &ProgressionState,
    actor_gender: Gender,
    mate: &ProgressionState,
    mate_gender: Gender,
) -> PairOutcome {
    let child_count = actor.child_count.max(mate.child_count);
    let mut a = *actor;
    let mut m = *mate;
    for side in [&mut a, &mut m] {
        side.step = ProgressionStep::AttemptingConception;
        side.gestation_age = 0;
        side.child_count = child_count;
    }
    with_dominance(a, m, pairing_driver(actor_gender, mate_gender))
}

/// Conception gate: probability first, then proximity.
pub fn conception_succeeds(
    distance: f32,
    config: &ProgressionConfig,
    rng: &mut impl Rng,
) -> bool {
    roll_percent(rng, config.conception_probability_percent) && distance <= config.conception_proximity
}

/// Conception succeeded: both sides move to Gestating, dominance flips to the
/// carrying side, and the child count grows by one on both sides.
pub fn plan_conception(
    actor: &ProgressionState,
    mate: &ProgressionState,
    carrier: Side,
) -> PairOutcome {
    let child_count = actor.child_count.max(mate.child_count) + 1;
    let mut a = *actor;
    let mut m = *mate;
    for side in [&mut a, &mut m] {
        side.step = ProgressionStep::Gestating;
        side.child_count = child_count;
    }
    match carrier {
        Side::Actor => a.gestation_age = 0,
        Side::Mate => m.gestation_age = 0,
    }
    with_dominance(a, m, carrier)
}

/// Advance gestation by one eligible evaluation. Returns true on the
/// evaluation where the child is due.
pub fn advance_gestation(carrier: &mut ProgressionState, config: &ProgressionConfig) -> bool {
    carrier.gestation_age = carrier.gestation_age.saturating_add(1);
    carrier.gestation_age >= config.gestation_duration_ticks
}

/// Post-birth gate for trying again. Bounded by the child cap, so the
/// conception/gestation loop always terminates.
pub fn continues_cycle(
    child_count: u32,
    mate_present: bool,
    config: &ProgressionConfig,
    rng: &mut impl Rng,
) -> bool {
    child_count < config.max_children_per_pair
        && roll_percent(rng, config.continuation_probability_percent)
        && mate_present
}

/// Child born. The carrier (the actor here) and a resolvable mate move to
/// Finished; with `continue_cycle` both move back to AttemptingConception
/// and dominance passes to the non-carrying side instead.
pub fn plan_birth(
    carrier: &ProgressionState,
    mate: Option<&ProgressionState>,
    continue_cycle: bool,
) -> PairOutcome {
    let mut c = *carrier;
    c.gestation_age = 0;
    c.step = ProgressionStep::Finished;

    let Some(mate) = mate else {
        return PairOutcome { actor: c, mate: None };
    };

    let mut m = *mate;
    m.step = ProgressionStep::Finished;
    m.child_count = c.child_count.max(m.child_count);
    c.child_count = m.child_count;

    if continue_cycle {
        c.step = ProgressionStep::AttemptingConception;
        m.step = ProgressionStep::AttemptingConception;
        with_dominance(c, m, Side::Mate)
    } else {
        with_dominance(c, m, Side::Actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn state(step: ProgressionStep, dominant: bool, children: u32) -> ProgressionState {
        ProgressionState {
            step,
            cooldown_ticks: 7,
            is_dominant: dominant,
            gestation_age: 0,
            child_count: children,
        }
    }

    #[test]
    fn test_pairing_male_drives() {
        let a = state(ProgressionStep::SearchingForPartner, true, 0);
        let b = state(ProgressionStep::SearchingForPartner, true, 0);

        let out = plan_pairing(&a, Gender::Male, &b, Gender::Female);
        let mate = out.mate.unwrap();
        assert_eq!(out.actor.step, ProgressionStep::AttemptingConception);
        assert_eq!(mate.step, ProgressionStep::AttemptingConception);
        assert!(out.actor.is_dominant);
        assert!(!mate.is_dominant);

        let out = plan_pairing(&a, Gender::Female, &b, Gender::Male);
        assert!(!out.actor.is_dominant);
        assert!(out.mate.unwrap().is_dominant);
    }

    #[test]
    fn test_pairing_aligns_child_counts() {
        let a = state(ProgressionStep::SearchingForPartner, true, 1);
        let b = state(ProgressionStep::SearchingForPartner, true, 3);
        let out = plan_pairing(&a, Gender::Male, &b, Gender::Female);
        assert_eq!(out.actor.child_count, 3);
        assert_eq!(out.mate.unwrap().child_count, 3);
    }

    #[test]
    fn test_planners_keep_cooldown() {
        let a = state(ProgressionStep::AttemptingConception, true, 0);
        let b = state(ProgressionStep::AttemptingConception, false, 0);
        let out = plan_conception(&a, &b, Side::Mate);
        assert_eq!(out.actor.cooldown_ticks, 7);
        assert_eq!(out.mate.unwrap().cooldown_ticks, 7);
    }

    #[test]
    fn test_conception_flips_dominance_to_carrier() {
        let a = state(ProgressionStep::AttemptingConception, true, 0);
        let b = state(ProgressionStep::AttemptingConception, false, 0);

        let carrier = carrying_side(Gender::Male, Gender::Female);
        assert_eq!(carrier, Side::Mate);

        let out = plan_conception(&a, &b, carrier);
        let mate = out.mate.unwrap();
        assert_eq!(out.actor.step, ProgressionStep::Gestating);
        assert_eq!(mate.step, ProgressionStep::Gestating);
        assert!(!out.actor.is_dominant);
        assert!(mate.is_dominant);
        assert_eq!(out.actor.child_count, 1);
        assert_eq!(mate.child_count, 1);
    }

    #[test]
    fn test_conception_requires_proximity() {
        let config = ProgressionConfig {
            conception_probability_percent: 100,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(conception_succeeds(8.5, &config, &mut rng));
        assert!(!conception_succeeds(8.6, &config, &mut rng));
    }

    #[test]
    fn test_gestation_due_at_duration() {
        let config = ProgressionConfig {
            gestation_duration_ticks: 3,
            ..Default::default()
        };
        let mut carrier = state(ProgressionStep::Gestating, true, 1);
        assert!(!advance_gestation(&mut carrier, &config));
        assert!(!advance_gestation(&mut carrier, &config));
        assert!(advance_gestation(&mut carrier, &config));
        assert_eq!(carrier.gestation_age, 3);
    }

    #[test]
    fn test_birth_without_continuation() {
        let carrier = state(ProgressionStep::Gestating, true, 1);
        let mate = state(ProgressionStep::Gestating, false, 1);

        let out = plan_birth(&carrier, Some(&mate), false);
        let m = out.mate.unwrap();
        assert_eq!(out.actor.step, ProgressionStep::Finished);
        assert_eq!(m.step, ProgressionStep::Finished);
        assert!(out.actor.is_dominant);
        assert!(!m.is_dominant);
        assert_eq!(out.actor.gestation_age, 0);
    }

    #[test]
    fn test_birth_with_continuation_flips_dominance() {
        let carrier = state(ProgressionStep::Gestating, true, 1);
        let mate = state(ProgressionStep::Gestating, false, 1);

        let out = plan_birth(&carrier, Some(&mate), true);
        let m = out.mate.unwrap();
        assert_eq!(out.actor.step, ProgressionStep::AttemptingConception);
        assert_eq!(m.step, ProgressionStep::AttemptingConception);
        assert!(!out.actor.is_dominant);
        assert!(m.is_dominant);
    }

    #[test]
    fn test_birth_without_mate() {
        let carrier = state(ProgressionStep::Gestating, true, 2);
        let out = plan_birth(&carrier, None, true);
        assert_eq!(out.actor.step, ProgressionStep::Finished);
        assert!(out.actor.is_dominant);
        assert!(out.mate.is_none());
    }

    #[test]
    fn test_cycle_stops_at_cap() {
        let config = ProgressionConfig {
            continuation_probability_percent: 100,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(continues_cycle(3, true, &config, &mut rng));
        assert!(!continues_cycle(4, true, &config, &mut rng));
        assert!(!continues_cycle(1, false, &config, &mut rng));
    }
}
