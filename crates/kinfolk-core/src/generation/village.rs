//! Village population generation

use hecs::World;
use rand::Rng;
use serde::{Deserialize, Serialize};

use kinfolk_logic::config::ProgressionConfig;
use kinfolk_logic::gates::roll_percent;

use super::names::generate_name;
use crate::components::*;
use crate::registry::VillagerRegistry;
use crate::systems::{spawn_villager, VillagerSpec};

/// Configuration for village generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VillageConfig {
    pub name: String,
    pub population: u32,
    /// Villagers are scattered over a disc of this radius around the origin.
    pub radius: f32,
    pub child_percent: u8,
    /// Share of single adult couples married off before the first tick.
    pub married_percent: u8,
}

impl Default for VillageConfig {
    fn default() -> Self {
        Self {
            name: "Millbrook".to_string(),
            population: 40,
            radius: 30.0,
            child_percent: 15,
            married_percent: 20,
        }
    }
}

/// Populate `world` with villagers. Returns their ids in creation order.
pub fn generate_village(
    world: &mut World,
    registry: &mut VillagerRegistry,
    config: &ProgressionConfig,
    village: &VillageConfig,
    rng: &mut impl Rng,
) -> Vec<VillagerId> {
    let adult_age_span = config.activation_threshold_ticks().saturating_mul(2).max(1);
    let child_age_span = config.childhood_duration_ticks().unwrap_or(1).max(1);

    let mut ids = Vec::with_capacity(village.population as usize);
    let mut single_men = Vec::new();
    let mut single_women = Vec::new();

    for _ in 0..village.population {
        let gender = Gender::random(rng);
        let is_child = roll_percent(rng, village.child_percent);

        // Uniform over the disc
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = village.radius.max(0.0) * rng.gen::<f32>().sqrt();

        let base = if is_child {
            VillagerSpec::child(gender).aged(rng.gen_range(0..child_age_span))
        } else {
            VillagerSpec::adult(gender).aged(rng.gen_range(0..adult_age_span))
        };
        let spec = base
            .at(distance * angle.cos(), 0.0, distance * angle.sin())
            .named(generate_name(gender, rng));

        let id = spawn_villager(world, registry, config, spec);
        ids.push(id);
        if !is_child {
            match gender {
                Gender::Male => single_men.push(id),
                Gender::Female => single_women.push(id),
            }
        }
    }

    let couples = single_men.len().min(single_women.len()) * usize::from(village.married_percent.min(100)) / 100;
    for (&husband, &wife) in single_men.iter().zip(single_women.iter()).take(couples) {
        marry_household(world, registry, husband, wife);
    }

    log::info!(
        "generated village {} with {} villagers and {} couples",
        village.name,
        ids.len(),
        couples
    );
    ids
}

/// Marry two villagers outside the controller. The wife takes the
/// husband's family name.
fn marry_household(world: &mut World, registry: &VillagerRegistry, husband: VillagerId, wife: VillagerId) {
    let (Some(h), Some(w)) = (registry.entity(husband), registry.entity(wife)) else {
        return;
    };
    let family = world.get::<&Name>(h).ok().map(|n| n.family.clone());
    if let (Some(family), Ok(mut name)) = (family, world.get::<&mut Name>(w)) {
        name.family = family;
    }
    if let Ok(mut marriage) = world.get::<&mut Marriage>(h) {
        *marriage = Marriage::married_to(wife);
    }
    if let Ok(mut marriage) = world.get::<&mut Marriage>(w) {
        *marriage = Marriage::married_to(husband);
    }
}
