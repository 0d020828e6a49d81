//! Pure life-cycle progression logic for Kinfolk.
//!
//! This crate holds every rule of the paired progression state machine that
//! does not need an entity store: identities, configuration, the per-agent
//! progression data, controller gates, transition planning and pair
//! invariants. Functions take plain data and return results, so the engine
//! crate only has to look things up and commit what these functions decide.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Recognized options, defaults, TOML/JSON loading, validation |
//! | [`events`] | Discrete notifications emitted on milestones |
//! | [`gates`] | Activation, dominance, cooldown and probability gates |
//! | [`ids`] | Villager identity, gender, marital status |
//! | [`invariants`] | Pair audits (dominance exclusivity, child-count parity) and healing |
//! | [`kinship`] | Parentage and partner eligibility |
//! | [`progression`] | Progression steps and per-agent progression state |
//! | [`transitions`] | Pairing, conception, gestation and birth planning |

pub mod config;
pub mod events;
pub mod gates;
pub mod ids;
pub mod invariants;
pub mod kinship;
pub mod progression;
pub mod transitions;
