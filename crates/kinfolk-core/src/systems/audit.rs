//! Pair audit - checks every loaded married pair after each tick and each
//! load, then heals or panics depending on the invariant mode.

use hecs::{Entity, World};
use std::collections::HashMap;

use kinfolk_logic::config::InvariantMode;
use kinfolk_logic::invariants::{audit_pair, heal_pair, PairSide, PairViolation};
use kinfolk_logic::progression::{ProgressionState, ProgressionStep};

use super::progression::store_progression;
use crate::components::*;

#[derive(Debug, Clone, Copy)]
struct Member {
    entity: Entity,
    marriage: Marriage,
    side: PairSide,
}

fn collect_members(world: &World) -> HashMap<VillagerId, Member> {
    let mut members = HashMap::new();
    let mut query = world.query::<(&Villager, &Marriage, &Behaviors, Option<&Carrying>)>();
    for (entity, (villager, marriage, behaviors, carrying)) in query.iter() {
        let Some(state) = behaviors.progression().copied() else {
            continue;
        };
        members.insert(
            villager.id,
            Member {
                entity,
                marriage: *marriage,
                side: PairSide {
                    id: villager.id,
                    gender: villager.gender,
                    carrying: carrying.is_some(),
                    state,
                },
            },
        );
    }
    members
}

/// Married to each other and past courtship. Two spouses both still in
/// SearchingForPartner were married externally and have not paired yet.
fn is_live_pair(a: &Member, b: &Member) -> bool {
    let searching = |s: &ProgressionState| s.step == ProgressionStep::SearchingForPartner;
    a.marriage.is_married_to(b.side.id)
        && b.marriage.is_married_to(a.side.id)
        && !(searching(&a.side.state) && searching(&b.side.state))
}

/// Loaded married pairs as `(lower id, higher id)`, ascending.
pub fn loaded_pairs(world: &World) -> Vec<(VillagerId, VillagerId)> {
    let members = collect_members(world);
    let mut pairs: Vec<_> = members
        .values()
        .filter_map(|m| {
            let spouse = m.marriage.spouse?;
            let other = members.get(&spouse)?;
            (m.side.id < spouse && is_live_pair(m, other)).then_some((m.side.id, spouse))
        })
        .collect();
    pairs.sort_unstable();
    pairs
}

/// Audit only. Nothing is written.
pub fn inspect_pairs(world: &World) -> Vec<PairViolation> {
    let members = collect_members(world);
    loaded_pairs(world)
        .into_iter()
        .filter_map(|(a, b)| Some((members.get(&a)?, members.get(&b)?)))
        .flat_map(|(a, b)| audit_pair(&a.side, &b.side))
        .collect()
}

/// Audit every loaded pair, or only `only` when given, and heal what is
/// found. In assert mode a critical violation panics instead.
pub fn audit_system(
    world: &mut World,
    mode: InvariantMode,
    only: Option<VillagerId>,
) -> Vec<PairViolation> {
    let members = collect_members(world);
    let mut found = Vec::new();

    for (a_id, b_id) in loaded_pairs(world) {
        if only.is_some_and(|id| id != a_id && id != b_id) {
            continue;
        }
        let (Some(a), Some(b)) = (members.get(&a_id), members.get(&b_id)) else {
            continue;
        };

        let violations = audit_pair(&a.side, &b.side);
        if violations.is_empty() {
            continue;
        }

        if mode == InvariantMode::Assert {
            if let Some(critical) = violations.iter().find(|v| v.is_critical()) {
                log::error!("{}", critical);
                panic!("pair invariant violated: {critical}");
            }
        }

        let mut a_side = a.side;
        let mut b_side = b.side;
        heal_pair(&mut a_side, &mut b_side);
        store_progression(world, a.entity, a_side.state);
        store_progression(world, b.entity, b_side.state);

        for violation in &violations {
            log::warn!("healed: {}", violation);
        }
        found.extend(violations);
    }
    found
}
