//! Progression fault taxonomy.
//!
//! None of these ever stop the tick loop. The controller logs them and keeps
//! going; public engine operations return them to the caller.

use thiserror::Error;

use kinfolk_logic::ids::VillagerId;
use kinfolk_logic::invariants::PairViolation;
use kinfolk_logic::progression::ProgressionStep;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgressionError {
    /// Spouse id does not name a loaded villager married back to the seeker.
    /// The transition is aborted and retried on a later evaluation.
    #[error("spouse {spouse} is not available")]
    MateUnavailable { spouse: VillagerId },

    #[error("{villager} cannot run {step:?}: {reason}")]
    InvalidTransitionRequest {
        villager: VillagerId,
        step: ProgressionStep,
        reason: String,
    },

    /// A persisted field was missing or malformed and a default was used.
    #[error("corrupt progression record for {villager}: `{field}` {reason}")]
    PersistenceCorruption {
        villager: VillagerId,
        field: &'static str,
        reason: String,
    },

    #[error("invariant violation: {0}")]
    InvariantViolation(PairViolation),

    #[error("villager {0} is not loaded")]
    UnknownVillager(VillagerId),

    #[error("villager {0} is already loaded")]
    AlreadyLoaded(VillagerId),
}

impl ProgressionError {
    pub fn invalid(villager: VillagerId, step: ProgressionStep, reason: impl Into<String>) -> Self {
        ProgressionError::InvalidTransitionRequest {
            villager,
            step,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProgressionError>;
