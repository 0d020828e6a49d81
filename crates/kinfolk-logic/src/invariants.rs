//! Pair invariants: exactly one dominant side, equal child counts, and the
//! passive side mirroring the dominant side's step.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{Gender, VillagerId};
use crate::progression::{ProgressionState, ProgressionStep};

/// One side of a married pair as seen by the audit.
#[derive(Debug, Clone, Copy)]
pub struct PairSide {
    pub id: VillagerId,
    pub gender: Gender,
    pub carrying: bool,
    pub state: ProgressionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairViolation {
    /// Zero or two dominant sides.
    DominanceNotExclusive {
        a: VillagerId,
        b: VillagerId,
        dominant_sides: u8,
    },
    ChildCountMismatch {
        a: VillagerId,
        b: VillagerId,
        a_count: u32,
        b_count: u32,
    },
    /// The passive side's step differs from the dominant side's. Happens when
    /// a birth ran while the mate was unloaded.
    StepDivergence {
        dominant: VillagerId,
        passive: VillagerId,
        dominant_step: ProgressionStep,
        passive_step: ProgressionStep,
    },
}

impl PairViolation {
    /// Critical violations are the ones strict mode refuses to heal.
    pub fn is_critical(&self) -> bool {
        !matches!(self, PairViolation::StepDivergence { .. })
    }
}

impl fmt::Display for PairViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairViolation::DominanceNotExclusive { a, b, dominant_sides } => write!(
                f,
                "pair {a}/{b} has {dominant_sides} dominant sides"
            ),
            PairViolation::ChildCountMismatch {
                a,
                b,
                a_count,
                b_count,
            } => write!(f, "pair {a}/{b} disagrees on child count ({a_count} vs {b_count})"),
            PairViolation::StepDivergence {
                dominant,
                passive,
                dominant_step,
                passive_step,
            } => write!(
                f,
                "passive {passive} is in {passive_step:?} while dominant {dominant} is in {dominant_step:?}"
            ),
        }
    }
}

/// Audit a pair without changing it.
pub fn audit_pair(a: &PairSide, b: &PairSide) -> Vec<PairViolation> {
    let mut violations = Vec::new();

    let dominant_sides = u8::from(a.state.is_dominant) + u8::from(b.state.is_dominant);
    if dominant_sides != 1 {
        violations.push(PairViolation::DominanceNotExclusive {
            a: a.id,
            b: b.id,
            dominant_sides,
        });
    }

    if a.state.child_count != b.state.child_count {
        violations.push(PairViolation::ChildCountMismatch {
            a: a.id,
            b: b.id,
            a_count: a.state.child_count,
            b_count: b.state.child_count,
        });
    }

    if dominant_sides == 1 && a.state.step != b.state.step {
        let (dominant, passive) = if a.state.is_dominant { (a, b) } else { (b, a) };
        violations.push(PairViolation::StepDivergence {
            dominant: dominant.id,
            passive: passive.id,
            dominant_step: dominant.state.step,
            passive_step: passive.state.step,
        });
    }

    violations
}

/// Which side should hold dominance when the flags cannot be trusted.
///
/// During gestation the carrying side drives; otherwise the male side does.
/// Ties fall back to the lower id so the choice is deterministic.
fn rightful_driver(a: &PairSide, b: &PairSide) -> bool {
    let gestating = a.state.step == ProgressionStep::Gestating
        || b.state.step == ProgressionStep::Gestating;
    if gestating && a.carrying != b.carrying {
        return a.carrying;
    }
    if gestating && a.gender != b.gender {
        return a.gender == Gender::Female;
    }
    if a.gender != b.gender {
        return a.gender == Gender::Male;
    }
    a.id < b.id
}

/// Repair a pair in place. Returns the violations that were found.
pub fn heal_pair(a: &mut PairSide, b: &mut PairSide) -> Vec<PairViolation> {
    let violations = audit_pair(a, b);
    if violations.is_empty() {
        return violations;
    }

    let dominant_sides = u8::from(a.state.is_dominant) + u8::from(b.state.is_dominant);
    if dominant_sides != 1 {
        let a_drives = rightful_driver(a, b);
        a.state.is_dominant = a_drives;
        b.state.is_dominant = !a_drives;
    }

    let child_count = a.state.child_count.max(b.state.child_count);
    a.state.child_count = child_count;
    b.state.child_count = child_count;

    if a.state.is_dominant {
        b.state.step = a.state.step;
    } else {
        a.state.step = b.state.step;
    }

    violations
}
