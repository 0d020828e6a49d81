//! Simulation engine - main entry point for running the simulation

use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use kinfolk_logic::config::ProgressionConfig;
use kinfolk_logic::events::LifeEvent;
use kinfolk_logic::invariants::PairViolation;
use kinfolk_logic::progression::{ProgressionState, ProgressionStep};

use crate::components::*;
use crate::error::{ProgressionError, Result};
use crate::generation::{generate_village, VillageConfig};
use crate::persistence::{capture_entity, restore_entity, SaveError, VillagerSnapshot};
use crate::registry::VillagerRegistry;
use crate::systems::*;

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world containing every loaded villager
    pub world: World,
    registry: VillagerRegistry,
    config: ProgressionConfig,
    rng: ChaCha8Rng,
    seed: u64,
    /// Ticks simulated since the world began
    tick: u64,
    /// Life events not yet drained by the caller
    events: Vec<LifeEvent>,
    /// Villagers whose mate was unreachable on their last attempt
    stranded: HashSet<VillagerId>,
}

impl SimulationEngine {
    /// Create an empty simulation with a seeded random stream
    pub fn new(config: ProgressionConfig, seed: u64) -> Self {
        Self {
            world: World::new(),
            registry: VillagerRegistry::new(),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            tick: 0,
            events: Vec::new(),
            stranded: HashSet::new(),
        }
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Populate the world with a generated village
    pub fn generate(&mut self, village: &VillageConfig) -> Vec<VillagerId> {
        generate_village(
            &mut self.world,
            &mut self.registry,
            &self.config,
            village,
            &mut self.rng,
        )
    }

    /// Advance the simulation by one tick.
    ///
    /// Order: aging, maturity, the progression controller over villagers in
    /// ascending id order, then the pair audit. Returns the recoverable
    /// faults and healed violations of this tick.
    pub fn tick(&mut self) -> Vec<ProgressionError> {
        self.tick += 1;

        aging_system(&mut self.world);
        maturity_system(&mut self.world, &self.config);

        let mut faults = progression_system(
            &mut self.world,
            &mut self.registry,
            &self.config,
            &mut self.rng,
            self.tick,
            &mut self.events,
            &mut self.stranded,
        );

        let healed = audit_system(&mut self.world, self.config.invariant_mode, None);
        faults.extend(healed.into_iter().map(ProgressionError::InvariantViolation));
        faults
    }

    /// Run `ticks` ticks, collecting every fault.
    pub fn run(&mut self, ticks: u64) -> Vec<ProgressionError> {
        let mut faults = Vec::new();
        for _ in 0..ticks {
            faults.extend(self.tick());
        }
        faults
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    pub fn spawn_villager(&mut self, spec: VillagerSpec) -> VillagerId {
        spawn_villager(&mut self.world, &mut self.registry, &self.config, spec)
    }

    pub fn spawn_child(
        &mut self,
        father: VillagerId,
        mother: VillagerId,
        position: Position,
        gender: Gender,
    ) -> VillagerId {
        spawn_child(
            &mut self.world,
            &mut self.registry,
            &self.config,
            &mut self.rng,
            father,
            mother,
            position,
            gender,
        )
    }

    /// Remove a villager for good (death). The spouse keeps a stale id.
    pub fn remove(&mut self, id: VillagerId) -> Result<()> {
        remove_villager(&mut self.world, &mut self.registry, id)
    }

    /// Take a villager out of the world, handing back everything needed to
    /// bring it back later.
    pub fn unload(&mut self, id: VillagerId) -> Result<VillagerSnapshot> {
        let entity = self.entity(id)?;
        let snapshot = capture_entity(&self.world, entity);
        self.registry.unregister(id);
        let _ = self.world.despawn(entity);
        log::info!("unloaded {}", id);
        Ok(snapshot)
    }

    /// Bring an unloaded villager back and reconcile its pair if the spouse
    /// is loaded. Returns the id with the record faults and pair repairs
    /// made along the way.
    pub fn reload(
        &mut self,
        snapshot: VillagerSnapshot,
    ) -> Result<(VillagerId, Vec<ProgressionError>)> {
        let id = snapshot
            .id()
            .ok_or_else(|| ProgressionError::PersistenceCorruption {
                villager: VillagerId(0),
                field: "villager",
                reason: "snapshot has no villager record".to_string(),
            })?;
        if self.registry.contains(id) {
            return Err(ProgressionError::AlreadyLoaded(id));
        }

        let (entity, mut faults) = restore_entity(&mut self.world, snapshot, &self.config);
        self.registry.register(id, entity);
        let healed = audit_system(&mut self.world, self.config.invariant_mode, Some(id));
        log::info!(
            "reloaded {} ({} record faults, {} pair repairs)",
            id,
            faults.len(),
            healed.len()
        );
        faults.extend(healed.into_iter().map(ProgressionError::InvariantViolation));
        Ok((id, faults))
    }

    // ── Relationship events ────────────────────────────────────────────

    /// Return one villager's progression to defaults and zero its time
    /// alive. The former mate, if any, is left as it is.
    pub fn reset_progression(&mut self, id: VillagerId) -> Result<()> {
        let entity = self.entity(id)?;
        self.edit_progression(id, |state| state.reset(&self.config))?;
        if let Ok(mut villager) = self.world.get::<&mut Villager>(entity) {
            villager.ticks_alive = 0;
        }
        let _ = self.world.remove_one::<Carrying>(entity);
        log::info!("{} progression reset", id);
        Ok(())
    }

    /// Dissolve a marriage. Both marriage records are cleared (the spouse's
    /// only if loaded); only the initiator's progression is reset.
    pub fn divorce(&mut self, id: VillagerId) -> Result<VillagerId> {
        let entity = self.entity(id)?;
        let marriage = self.marriage(id).unwrap_or_default();
        let Some(spouse) = marriage.partner() else {
            let step = self.progression(id).map(|s| s.step).unwrap_or_default();
            return Err(ProgressionError::invalid(id, step, "not married"));
        };

        if let Ok(mut m) = self.world.get::<&mut Marriage>(entity) {
            m.clear();
        }
        if let Some(spouse_entity) = self.registry.entity(spouse) {
            if let Ok(mut m) = self.world.get::<&mut Marriage>(spouse_entity) {
                if m.partner() == Some(id) {
                    m.clear();
                }
            }
        }
        self.reset_progression(id)?;
        log::info!("{} divorced {}", id, spouse);
        Ok(spouse)
    }

    /// Marry two villagers from outside the controller. Progression is not
    /// touched; the first SearchingForPartner evaluation pairs them.
    pub fn arrange_marriage(&mut self, a: VillagerId, b: VillagerId) -> Result<()> {
        let a_entity = self.entity(a)?;
        let b_entity = self.entity(b)?;
        let a_step = self.progression(a).map(|s| s.step).unwrap_or_default();
        if a == b {
            return Err(ProgressionError::invalid(a, a_step, "cannot marry self"));
        }

        for (me, other) in [(a, b), (b, a)] {
            if let Some(current) = self.marriage(me).and_then(|m| m.partner()) {
                if current != other {
                    let step = self.progression(me).map(|s| s.step).unwrap_or_default();
                    return Err(ProgressionError::invalid(
                        me,
                        step,
                        format!("already bound to {current}"),
                    ));
                }
            }
        }

        for (entity, spouse) in [(a_entity, b), (b_entity, a)] {
            if let Ok(mut m) = self.world.get::<&mut Marriage>(entity) {
                *m = Marriage::married_to(spouse);
            }
        }
        log::info!("{} and {} married by arrangement", a, b);
        Ok(())
    }

    pub fn set_step(&mut self, id: VillagerId, step: ProgressionStep) -> Result<()> {
        self.edit_progression(id, |state| state.step = step)
    }

    pub fn set_dominant(&mut self, id: VillagerId, dominant: bool) -> Result<()> {
        self.edit_progression(id, |state| state.is_dominant = dominant)
    }

    pub fn set_cooldown(&mut self, id: VillagerId, ticks: u32) -> Result<()> {
        self.edit_progression(id, |state| state.cooldown_ticks = ticks)
    }

    pub fn set_position(&mut self, id: VillagerId, position: Position) -> Result<()> {
        let entity = self.entity(id)?;
        let _ = self.world.insert_one(entity, position);
        Ok(())
    }

    pub fn assign_chore(&mut self, id: VillagerId, chore: ChoreSlot) -> Result<()> {
        let entity = self.entity(id)?;
        let mut behaviors = self
            .world
            .get::<&mut Behaviors>(entity)
            .map_err(|_| ProgressionError::UnknownVillager(id))?;
        behaviors.insert(BehaviorState::Chore(chore));
        Ok(())
    }

    // ── Per-agent persistence ──────────────────────────────────────────

    /// The per-agent progression record.
    pub fn serialize_progression(&self, id: VillagerId) -> Result<String> {
        let state = self
            .progression(id)
            .ok_or_else(|| self.no_progression(id))?;
        Ok(crate::persistence::serialize_progression(&state))
    }

    /// Replace a villager's progression state from a per-agent record.
    /// Returns the fields that had to be defaulted.
    pub fn deserialize_progression(
        &mut self,
        id: VillagerId,
        blob: &str,
    ) -> Result<Vec<ProgressionError>> {
        let (loaded, faults) = crate::persistence::deserialize_progression(id, blob, &self.config);
        self.edit_progression(id, |state| *state = loaded)?;
        audit_system(&mut self.world, self.config.invariant_mode, Some(id));
        Ok(faults)
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn is_loaded(&self, id: VillagerId) -> bool {
        self.registry.contains(id)
    }

    pub fn villager_count(&self) -> usize {
        self.registry.len()
    }

    pub fn villager_ids(&self) -> Vec<VillagerId> {
        self.registry.sorted_ids()
    }

    pub fn villager(&self, id: VillagerId) -> Option<Villager> {
        self.component::<Villager>(id)
    }

    pub fn marriage(&self, id: VillagerId) -> Option<Marriage> {
        self.component::<Marriage>(id)
    }

    pub fn parentage(&self, id: VillagerId) -> Option<Parentage> {
        self.component::<Parentage>(id)
    }

    pub fn position(&self, id: VillagerId) -> Option<Position> {
        self.component::<Position>(id)
    }

    pub fn name(&self, id: VillagerId) -> Option<Name> {
        self.component::<Name>(id)
    }

    pub fn behaviors(&self, id: VillagerId) -> Option<Behaviors> {
        self.component::<Behaviors>(id)
    }

    pub fn progression(&self, id: VillagerId) -> Option<ProgressionState> {
        self.behaviors(id).and_then(|b| b.progression().copied())
    }

    pub fn is_carrying(&self, id: VillagerId) -> bool {
        self.component::<Carrying>(id).is_some()
    }

    /// Loaded married pairs past courtship, as `(lower id, higher id)`.
    pub fn pairs(&self) -> Vec<(VillagerId, VillagerId)> {
        loaded_pairs(&self.world)
    }

    /// Current pair violations, without healing them.
    pub fn audit_pairs(&self) -> Vec<PairViolation> {
        inspect_pairs(&self.world)
    }

    pub fn pending_events(&self) -> &[LifeEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<LifeEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Whole-simulation persistence ───────────────────────────────────

    /// Save simulation state to a writer
    pub fn save<W: Write>(&self, writer: W) -> std::result::Result<(), SaveError> {
        crate::persistence::save_simulation(
            writer,
            &self.world,
            crate::persistence::SaveHeader {
                tick: self.tick,
                seed: self.seed,
                rng_word_pos: self.rng.get_word_pos(),
                next_id: self.registry.next_id(),
            },
            &self.config,
            &self.events,
        )
    }

    /// Load simulation state from a reader. Returns the record faults and
    /// pair repairs made while loading.
    pub fn load<R: std::io::Read>(
        &mut self,
        reader: R,
    ) -> std::result::Result<Vec<ProgressionError>, SaveError> {
        let loaded = crate::persistence::load_simulation(reader)?;

        self.world = loaded.world;
        self.registry = VillagerRegistry::rebuild(&self.world, loaded.header.next_id);
        self.tick = loaded.header.tick;
        self.seed = loaded.header.seed;
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.rng.set_word_pos(loaded.header.rng_word_pos);
        self.config = loaded.config;
        self.events = loaded.events;
        self.stranded.clear();

        let mut faults = loaded.faults;
        let healed = audit_system(&mut self.world, self.config.invariant_mode, None);
        faults.extend(healed.into_iter().map(ProgressionError::InvariantViolation));

        log::info!(
            "loaded tick {} with {} villagers ({} faults)",
            self.tick,
            self.registry.len(),
            faults.len()
        );
        Ok(faults)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> std::result::Result<(), SaveError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> std::result::Result<Vec<ProgressionError>, SaveError> {
        let file = File::open(path)?;
        self.load(BufReader::new(file))
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn entity(&self, id: VillagerId) -> Result<Entity> {
        self.registry
            .entity(id)
            .filter(|e| self.world.contains(*e))
            .ok_or(ProgressionError::UnknownVillager(id))
    }

    fn component<T: hecs::Component + Clone>(&self, id: VillagerId) -> Option<T> {
        let entity = self.registry.entity(id)?;
        self.world.get::<&T>(entity).ok().map(|c| (*c).clone())
    }

    fn no_progression(&self, id: VillagerId) -> ProgressionError {
        ProgressionError::invalid(id, ProgressionStep::Unknown, "has no progression behavior")
    }

    fn edit_progression<T>(
        &self,
        id: VillagerId,
        edit: impl FnOnce(&mut ProgressionState) -> T,
    ) -> Result<T> {
        let entity = self.entity(id)?;
        let mut behaviors = self
            .world
            .get::<&mut Behaviors>(entity)
            .map_err(|_| self.no_progression(id))?;
        let state = behaviors
            .progression_mut()
            .ok_or_else(|| self.no_progression(id))?;
        Ok(edit(state))
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new(ProgressionConfig::default(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_creation() {
        let engine = SimulationEngine::default();
        assert_eq!(engine.villager_count(), 0);
        assert_eq!(engine.current_tick(), 0);
    }

    #[test]
    fn test_engine_generation() {
        let mut engine = SimulationEngine::new(ProgressionConfig::default(), 3);
        let ids = engine.generate(&VillageConfig {
            population: 25,
            ..Default::default()
        });
        assert_eq!(ids.len(), 25);
        assert_eq!(engine.villager_count(), 25);
    }

    #[test]
    fn test_tick_ages_villagers() {
        let mut engine = SimulationEngine::default();
        let id = engine.spawn_villager(VillagerSpec::adult(Gender::Male));
        engine.run(10);
        assert_eq!(engine.current_tick(), 10);
        assert_eq!(engine.villager(id).unwrap().ticks_alive, 10);
    }

    #[test]
    fn test_unknown_villager_errors() {
        let mut engine = SimulationEngine::default();
        let ghost = VillagerId(42);
        assert_eq!(engine.remove(ghost), Err(ProgressionError::UnknownVillager(ghost)));
        assert_eq!(
            engine.reset_progression(ghost),
            Err(ProgressionError::UnknownVillager(ghost))
        );
        assert!(engine.unload(ghost).is_err());
    }

    #[test]
    fn test_arrange_marriage_rejects_bound_villager() {
        let mut engine = SimulationEngine::default();
        let a = engine.spawn_villager(VillagerSpec::adult(Gender::Male));
        let b = engine.spawn_villager(VillagerSpec::adult(Gender::Female));
        let c = engine.spawn_villager(VillagerSpec::adult(Gender::Female));

        engine.arrange_marriage(a, b).unwrap();
        assert_eq!(engine.marriage(a), Some(Marriage::married_to(b)));
        assert!(matches!(
            engine.arrange_marriage(a, c),
            Err(ProgressionError::InvalidTransitionRequest { .. })
        ));
        assert!(engine.arrange_marriage(a, a).is_err());
    }

    #[test]
    fn test_assign_chore_is_stored_alongside_progression() {
        let mut engine = SimulationEngine::default();
        let id = engine.spawn_villager(VillagerSpec::adult(Gender::Female));
        let chore = ChoreSlot {
            chore: Some(ChoreKind::Woodcutting),
            active: true,
        };
        engine.assign_chore(id, chore).unwrap();

        let behaviors = engine.behaviors(id).unwrap();
        assert_eq!(behaviors.chore(), Some(&chore));
        assert!(behaviors.progression().is_some());
    }
}
