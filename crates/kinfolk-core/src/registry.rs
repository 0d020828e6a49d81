//! Identity registry: stable villager ids to live hecs entities.
//!
//! Entities are reallocated on every load and reload, so nothing outside the
//! world stores an `Entity` long term. Cross-villager references (spouse,
//! parents) hold a [`VillagerId`] and go through this table at point of use.

use hecs::{Entity, World};
use std::collections::HashMap;

use crate::components::{Villager, VillagerId};

#[derive(Debug, Default, Clone)]
pub struct VillagerRegistry {
    by_id: HashMap<VillagerId, Entity>,
    next_id: u64,
}

impl VillagerRegistry {
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            next_id: 1,
        }
    }

    /// Hand out a fresh id. Ids are never reused, even after removal.
    pub fn allocate(&mut self) -> VillagerId {
        let id = VillagerId(self.next_id.max(1));
        self.next_id = id.raw() + 1;
        id
    }

    pub fn register(&mut self, id: VillagerId, entity: Entity) {
        self.next_id = self.next_id.max(id.raw() + 1);
        self.by_id.insert(id, entity);
    }

    pub fn unregister(&mut self, id: VillagerId) -> Option<Entity> {
        self.by_id.remove(&id)
    }

    pub fn entity(&self, id: VillagerId) -> Option<Entity> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: VillagerId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Loaded ids in ascending order. The controller evaluates in this order.
    pub fn sorted_ids(&self) -> Vec<VillagerId> {
        let mut ids: Vec<VillagerId> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Rebuild from the villagers present in `world`, keeping the id
    /// counter at least at `next_id`.
    pub fn rebuild(world: &World, next_id: u64) -> Self {
        let mut registry = Self {
            by_id: HashMap::new(),
            next_id: next_id.max(1),
        };
        for (entity, villager) in world.query::<&Villager>().iter() {
            registry.register(villager.id, entity);
        }
        registry
    }
}
