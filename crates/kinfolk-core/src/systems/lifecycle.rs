//! Villager lifecycle: creation, birth and removal.

use hecs::World;
use rand::Rng;

use kinfolk_logic::config::ProgressionConfig;
use kinfolk_logic::progression::ProgressionState;

use crate::components::*;
use crate::error::{ProgressionError, Result};
use crate::generation::{family_name, given_name};
use crate::registry::VillagerRegistry;

/// Everything needed to create a villager. The id is assigned on spawn.
#[derive(Debug, Clone)]
pub struct VillagerSpec {
    pub gender: Gender,
    pub name: Option<Name>,
    pub position: Position,
    pub is_child: bool,
    pub ticks_alive: u64,
    pub parentage: Option<Parentage>,
    pub chore: Option<ChoreSlot>,
}

impl VillagerSpec {
    pub fn adult(gender: Gender) -> Self {
        Self {
            gender,
            name: None,
            position: Position::default(),
            is_child: false,
            ticks_alive: 0,
            parentage: None,
            chore: None,
        }
    }

    pub fn child(gender: Gender) -> Self {
        Self {
            is_child: true,
            ..Self::adult(gender)
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Position::new(x, y, z);
        self
    }

    pub fn named(mut self, name: Name) -> Self {
        self.name = Some(name);
        self
    }

    pub fn aged(mut self, ticks_alive: u64) -> Self {
        self.ticks_alive = ticks_alive;
        self
    }

    pub fn with_parents(mut self, parentage: Parentage) -> Self {
        self.parentage = Some(parentage);
        self
    }

    pub fn with_chore(mut self, chore: ChoreSlot) -> Self {
        self.chore = Some(chore);
        self
    }
}

/// Create a villager with a default progression state.
pub fn spawn_villager(
    world: &mut World,
    registry: &mut VillagerRegistry,
    config: &ProgressionConfig,
    spec: VillagerSpec,
) -> VillagerId {
    let id = registry.allocate();

    let mut behaviors =
        Behaviors::new().with(BehaviorState::Progression(ProgressionState::new(config)));
    if let Some(chore) = spec.chore {
        behaviors.insert(BehaviorState::Chore(chore));
    }

    let villager = Villager {
        id,
        gender: spec.gender,
        is_child: spec.is_child,
        ticks_alive: spec.ticks_alive,
    };
    let entity = world.spawn((villager, Marriage::default(), spec.position, behaviors));
    if let Some(name) = spec.name {
        let _ = world.insert_one(entity, name);
    }
    if let Some(parentage) = spec.parentage {
        let _ = world.insert_one(entity, parentage);
    }

    registry.register(id, entity);
    log::debug!("spawned {} ({:?})", id, spec.gender);
    id
}

/// Create a newborn. The child takes the father's family name when the
/// father is loaded, else the mother's, else a random one.
#[allow(clippy::too_many_arguments)]
pub fn spawn_child(
    world: &mut World,
    registry: &mut VillagerRegistry,
    config: &ProgressionConfig,
    rng: &mut impl Rng,
    father: VillagerId,
    mother: VillagerId,
    position: Position,
    gender: Gender,
) -> VillagerId {
    let family = [father, mother]
        .into_iter()
        .filter_map(|parent| registry.entity(parent))
        .find_map(|entity| world.get::<&Name>(entity).ok().map(|n| n.family.clone()))
        .unwrap_or_else(|| family_name(rng).to_string());
    let name = Name::new(given_name(gender, rng), family);
    let full_name = name.full_name();

    let spec = VillagerSpec {
        position,
        name: Some(name),
        parentage: Some(Parentage::new(father, mother)),
        ..VillagerSpec::child(gender)
    };
    let id = spawn_villager(world, registry, config, spec);
    log::debug!("{} is {}, child of {} and {}", id, full_name, father, mother);
    id
}

/// Despawn a villager for good. A spouse keeps its now stale spouse id.
pub fn remove_villager(
    world: &mut World,
    registry: &mut VillagerRegistry,
    id: VillagerId,
) -> Result<()> {
    let entity = registry
        .unregister(id)
        .ok_or(ProgressionError::UnknownVillager(id))?;
    let _ = world.despawn(entity);
    log::info!("removed {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_spawn_attaches_default_progression() {
        let mut world = World::new();
        let mut registry = VillagerRegistry::new();
        let config = ProgressionConfig::default();

        let id = spawn_villager(
            &mut world,
            &mut registry,
            &config,
            VillagerSpec::adult(Gender::Female).at(1.0, 0.0, 2.0),
        );

        let entity = registry.entity(id).unwrap();
        let behaviors = world.get::<&Behaviors>(entity).unwrap();
        assert!(behaviors.progression().unwrap().is_default(&config));
        assert_eq!(*world.get::<&Marriage>(entity).unwrap(), Marriage::default());
        assert_eq!(world.get::<&Villager>(entity).unwrap().id, id);
    }

    #[test]
    fn test_child_takes_father_family_name() {
        let mut world = World::new();
        let mut registry = VillagerRegistry::new();
        let config = ProgressionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let father = spawn_villager(
            &mut world,
            &mut registry,
            &config,
            VillagerSpec::adult(Gender::Male).named(Name::new("Bram", "Thatcher")),
        );
        let mother = spawn_villager(
            &mut world,
            &mut registry,
            &config,
            VillagerSpec::adult(Gender::Female).named(Name::new("Maud", "Oakley")),
        );

        let child = spawn_child(
            &mut world,
            &mut registry,
            &config,
            &mut rng,
            father,
            mother,
            Position::new(3.0, 0.0, 3.0),
            Gender::Female,
        );

        let entity = registry.entity(child).unwrap();
        assert_eq!(world.get::<&Name>(entity).unwrap().family, "Thatcher");
        assert!(world.get::<&Villager>(entity).unwrap().is_child);
        assert_eq!(
            *world.get::<&Parentage>(entity).unwrap(),
            Parentage::new(father, mother)
        );
    }

    #[test]
    fn test_remove_unknown_villager() {
        let mut world = World::new();
        let mut registry = VillagerRegistry::new();
        assert_eq!(
            remove_villager(&mut world, &mut registry, VillagerId(9)),
            Err(ProgressionError::UnknownVillager(VillagerId(9)))
        );
    }
}
