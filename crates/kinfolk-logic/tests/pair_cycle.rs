//! Drives the pure planners through whole pair life cycles.
//!
//! No entity store here: two `ProgressionState` values stand in for the two
//! agents, and the test plays the engine's role of committing outcomes.

use kinfolk_logic::config::ProgressionConfig;
use kinfolk_logic::ids::{Gender, VillagerId};
use kinfolk_logic::invariants::{audit_pair, PairSide};
use kinfolk_logic::progression::{ProgressionState, ProgressionStep};
use kinfolk_logic::transitions::{
    advance_gestation, carrying_side, continues_cycle, plan_birth, plan_conception, plan_pairing,
    PairOutcome, Side,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ── Helpers ────────────────────────────────────────────────────────────

struct Pair {
    husband: ProgressionState,
    wife: ProgressionState,
}

impl Pair {
    fn new(config: &ProgressionConfig) -> Self {
        let husband = ProgressionState::new(config);
        let wife = ProgressionState::new(config);
        let out = plan_pairing(&husband, Gender::Male, &wife, Gender::Female);
        Self {
            husband: out.actor,
            wife: out.mate.unwrap(),
        }
    }

    fn commit(&mut self, husband_acted: bool, out: PairOutcome) {
        let mate = out.mate.unwrap();
        if husband_acted {
            self.husband = out.actor;
            self.wife = mate;
        } else {
            self.wife = out.actor;
            self.husband = mate;
        }
    }

    fn assert_consistent(&self) {
        let a = PairSide {
            id: VillagerId(1),
            gender: Gender::Male,
            carrying: false,
            state: self.husband,
        };
        let b = PairSide {
            id: VillagerId(2),
            gender: Gender::Female,
            carrying: self.wife.step == ProgressionStep::Gestating,
            state: self.wife,
        };
        let violations = audit_pair(&a, &b);
        assert!(violations.is_empty(), "{violations:?}");
    }

    /// One evaluation of whichever side is dominant. Returns false once the
    /// pair reached Finished.
    fn evaluate(&mut self, config: &ProgressionConfig, conceive: bool, rng: &mut ChaCha8Rng) -> bool {
        match (self.husband.step, self.husband.is_dominant) {
            (ProgressionStep::AttemptingConception, true) => {
                if conceive {
                    let carrier = carrying_side(Gender::Male, Gender::Female);
                    assert_eq!(carrier, Side::Mate);
                    let out = plan_conception(&self.husband, &self.wife, carrier);
                    self.commit(true, out);
                }
                true
            }
            (ProgressionStep::Gestating, false) => {
                let mut wife = self.wife;
                if advance_gestation(&mut wife, config) {
                    let again = continues_cycle(wife.child_count, true, config, rng);
                    let out = plan_birth(&wife, Some(&self.husband), again);
                    self.commit(false, out);
                } else {
                    self.wife = wife;
                }
                true
            }
            (ProgressionStep::Finished, _) => false,
            other => panic!("unexpected pair state {other:?}"),
        }
    }
}

// ── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn pairing_puts_husband_in_charge() {
    let pair = Pair::new(&ProgressionConfig::default());
    assert_eq!(pair.husband.step, ProgressionStep::AttemptingConception);
    assert_eq!(pair.wife.step, ProgressionStep::AttemptingConception);
    assert!(pair.husband.is_dominant);
    assert!(!pair.wife.is_dominant);
}

#[test]
fn always_continuing_pair_stops_at_cap() {
    let config = ProgressionConfig {
        continuation_probability_percent: 100,
        gestation_duration_ticks: 2,
        ..Default::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut pair = Pair::new(&config);

    let mut evaluations = 0;
    while pair.evaluate(&config, true, &mut rng) {
        pair.assert_consistent();
        evaluations += 1;
        assert!(evaluations < 100, "cycle did not terminate");
    }

    assert_eq!(pair.husband.child_count, config.max_children_per_pair);
    assert_eq!(pair.wife.child_count, config.max_children_per_pair);
    assert_eq!(pair.husband.step, ProgressionStep::Finished);
    assert_eq!(pair.wife.step, ProgressionStep::Finished);
}

#[test]
fn never_continuing_pair_has_one_child() {
    let config = ProgressionConfig {
        continuation_probability_percent: 0,
        ..Default::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let mut pair = Pair::new(&config);

    while pair.evaluate(&config, true, &mut rng) {
        pair.assert_consistent();
    }
    assert_eq!(pair.husband.child_count, 1);
    assert!(pair.wife.is_dominant);
}

// ── Properties ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn cycle_terminates_within_cap(
        seed in any::<u64>(),
        cap in 0u32..6,
        continuation in 0u8..=100,
        gestation in 1u32..4,
        conceive_rolls in proptest::collection::vec(any::<bool>(), 1..64),
    ) {
        let config = ProgressionConfig {
            max_children_per_pair: cap,
            continuation_probability_percent: continuation,
            gestation_duration_ticks: gestation,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut pair = Pair::new(&config);

        let mut rolls = conceive_rolls.iter().cycle();
        let mut births = 0u32;
        let mut evaluations = 0u32;
        loop {
            let before = pair.husband.child_count;
            let conceive = *rolls.next().unwrap() || evaluations > 200;
            if !pair.evaluate(&config, conceive, &mut rng) {
                break;
            }
            if pair.husband.child_count > before {
                births += 1;
            }
            pair.assert_consistent();
            evaluations += 1;
            prop_assert!(evaluations < 10_000);
        }

        prop_assert!(births >= 1);
        prop_assert!(births <= cap.max(1));
        prop_assert_eq!(pair.husband.child_count, pair.wife.child_count);
    }
}
