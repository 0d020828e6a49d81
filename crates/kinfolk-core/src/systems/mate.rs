//! Mate resolver: spouse id to the spouse's live progression state.

use hecs::{Entity, World};

use kinfolk_logic::progression::ProgressionState;

use crate::components::*;
use crate::error::{ProgressionError, Result};
use crate::registry::VillagerRegistry;

/// Copy of the spouse's side taken at resolution time. Writes go back
/// through `entity` in the same tick.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMate {
    pub id: VillagerId,
    pub entity: Entity,
    pub gender: Gender,
    pub position: Option<Position>,
    pub carrying: bool,
    pub state: ProgressionState,
}

/// Resolve `spouse` on behalf of `seeker`.
///
/// Fails with `MateUnavailable` when the spouse is not loaded, has no
/// progression state, or is not bound back to the seeker (a stale id).
pub fn resolve_mate(
    world: &World,
    registry: &VillagerRegistry,
    seeker: VillagerId,
    spouse: VillagerId,
) -> Result<ResolvedMate> {
    let unavailable = || ProgressionError::MateUnavailable { spouse };

    let entity = registry
        .entity(spouse)
        .filter(|entity| world.contains(*entity))
        .ok_or_else(unavailable)?;
    let entity_ref = world.entity(entity).map_err(|_| unavailable())?;

    let gender = entity_ref
        .get::<&Villager>()
        .map(|v| v.gender)
        .ok_or_else(unavailable)?;
    let bound_back = entity_ref
        .get::<&Marriage>()
        .map(|m| m.partner() == Some(seeker))
        .unwrap_or(false);
    if !bound_back {
        return Err(unavailable());
    }
    let state = entity_ref
        .get::<&Behaviors>()
        .and_then(|b| b.progression().copied())
        .ok_or_else(unavailable)?;

    Ok(ResolvedMate {
        id: spouse,
        entity,
        gender,
        position: entity_ref.get::<&Position>().map(|p| *p),
        carrying: entity_ref.has::<Carrying>(),
        state,
    })
}
