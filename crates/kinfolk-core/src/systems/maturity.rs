//! Aging and maturity.

use hecs::World;

use kinfolk_logic::config::ProgressionConfig;

use crate::components::{Villager, VillagerId};

/// Advance every loaded villager's ticks-alive counter by one.
pub fn aging_system(world: &mut World) {
    for (_, villager) in world.query_mut::<&mut Villager>() {
        villager.ticks_alive = villager.ticks_alive.saturating_add(1);
    }
}

/// Turn children who have lived through childhood into adults.
/// Returns the ids that matured, in ascending order.
pub fn maturity_system(world: &mut World, config: &ProgressionConfig) -> Vec<VillagerId> {
    let Some(childhood) = config.childhood_duration_ticks() else {
        return Vec::new();
    };

    let mut matured = Vec::new();
    for (_, villager) in world.query_mut::<&mut Villager>() {
        if villager.is_child && villager.ticks_alive >= childhood {
            villager.is_child = false;
            matured.push(villager.id);
        }
    }
    matured.sort_unstable();
    for id in &matured {
        log::info!("{} came of age", id);
    }
    matured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Gender;
    use kinfolk_logic::config::TICKS_PER_MINUTE;

    #[test]
    fn test_aging_increments_everyone() {
        let mut world = World::new();
        let e = world.spawn((Villager::adult(VillagerId(1), Gender::Male),));
        aging_system(&mut world);
        aging_system(&mut world);
        assert_eq!(world.get::<&Villager>(e).unwrap().ticks_alive, 2);
    }

    #[test]
    fn test_child_matures_after_childhood() {
        let config = ProgressionConfig {
            childhood_duration_minutes: 1,
            ..Default::default()
        };
        let mut world = World::new();
        let mut child = Villager::child(VillagerId(2), Gender::Female);
        child.ticks_alive = TICKS_PER_MINUTE - 1;
        let e = world.spawn((child,));

        assert!(maturity_system(&mut world, &config).is_empty());
        aging_system(&mut world);
        assert_eq!(maturity_system(&mut world, &config), vec![VillagerId(2)]);
        assert!(!world.get::<&Villager>(e).unwrap().is_child);
    }

    #[test]
    fn test_zero_childhood_disables_maturation() {
        let config = ProgressionConfig {
            childhood_duration_minutes: 0,
            ..Default::default()
        };
        let mut world = World::new();
        let mut child = Villager::child(VillagerId(3), Gender::Male);
        child.ticks_alive = u64::MAX;
        world.spawn((child,));
        assert!(maturity_system(&mut world, &config).is_empty());
    }
}
