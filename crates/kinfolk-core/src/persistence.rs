//! Save/Load functionality for persisting simulation state
//!
//! Two levels:
//! - the per-agent progression record, a small JSON object read back field by
//!   field so one bad field never costs the rest of the record;
//! - the whole simulation, bincode-encoded, with every villager's components
//!   serialized individually and reconstructed on load.
//!
//! Spouse linkage is never stored as an entity handle. It is rebuilt from the
//! `Marriage` component's spouse id through the registry.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{Read, Write};
use thiserror::Error;

use kinfolk_logic::config::ProgressionConfig;
use kinfolk_logic::events::LifeEvent;
use kinfolk_logic::progression::{ProgressionState, ProgressionStep};

use crate::components::*;
use crate::error::ProgressionError;

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

// ── Per-agent progression record ───────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressionRecord {
    step: i64,
    cooldown_ticks: u32,
    is_dominant: bool,
    gestation_age: u32,
    child_count: u32,
}

/// Encode one agent's progression state.
pub fn serialize_progression(state: &ProgressionState) -> String {
    let record = ProgressionRecord {
        step: state.step.id(),
        cooldown_ticks: state.cooldown_ticks,
        is_dominant: state.is_dominant,
        gestation_age: state.gestation_age,
        child_count: state.child_count,
    };
    // A struct of plain integers and a bool always encodes.
    serde_json::to_string(&record).unwrap_or_default()
}

/// Decode one agent's progression state, substituting the documented default
/// for every missing or malformed field. Each substitution is returned as a
/// `PersistenceCorruption` fault and logged.
pub fn deserialize_progression(
    villager: VillagerId,
    blob: &str,
    config: &ProgressionConfig,
) -> (ProgressionState, Vec<ProgressionError>) {
    let mut faults = Vec::new();
    let mut corrupt = |field: &'static str, reason: String| {
        let fault = ProgressionError::PersistenceCorruption {
            villager,
            field,
            reason,
        };
        log::warn!("{}", fault);
        faults.push(fault);
    };

    let fields: Map<String, Value> = match serde_json::from_str::<Value>(blob) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            corrupt("record", format!("is not an object: {other}"));
            Map::new()
        }
        Err(e) => {
            corrupt("record", format!("is not valid JSON: {e}"));
            Map::new()
        }
    };

    let step = match fields.get("step") {
        None => {
            corrupt("step", "is missing".to_string());
            ProgressionStep::SearchingForPartner
        }
        Some(value) => match value.as_i64() {
            Some(id) => {
                let step = ProgressionStep::from_id(id);
                if step == ProgressionStep::Unknown && id != ProgressionStep::Unknown.id() {
                    corrupt("step", format!("has unrecognized id {id}"));
                }
                step
            }
            None => {
                corrupt("step", format!("is not an integer: {value}"));
                ProgressionStep::SearchingForPartner
            }
        },
    };

    let mut counter = |field: &'static str, default: u32| match fields.get(field) {
        None => {
            corrupt(field, "is missing".to_string());
            default
        }
        Some(value) => match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) => n,
            None => {
                corrupt(field, format!("is not a counter: {value}"));
                default
            }
        },
    };
    let cooldown_ticks = counter("cooldownTicks", config.initial_cooldown_ticks);
    let gestation_age = counter("gestationAge", 0);
    let child_count = counter("childCount", 0);

    let is_dominant = match fields.get("isDominant") {
        Some(Value::Bool(b)) => *b,
        None => {
            corrupt("isDominant", "is missing".to_string());
            true
        }
        Some(other) => {
            corrupt("isDominant", format!("is not a bool: {other}"));
            true
        }
    };

    let state = ProgressionState {
        step,
        cooldown_ticks,
        is_dominant,
        gestation_age,
        child_count,
    };
    (state, faults)
}

// ── Entity snapshots ───────────────────────────────────────────────────

/// All components of one villager, serialized as optionals. Also used as
/// the unload/reload snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SerializableEntity {
    pub villager: Option<Villager>,
    pub name: Option<Name>,
    pub position: Option<Position>,
    pub marriage: Option<Marriage>,
    pub parentage: Option<Parentage>,
    pub carrying: Option<Carrying>,
    pub chore: Option<ChoreSlot>,
    /// Per-agent progression record, see [`serialize_progression`].
    pub progression: Option<String>,
}

pub type VillagerSnapshot = SerializableEntity;

impl SerializableEntity {
    pub fn id(&self) -> Option<VillagerId> {
        self.villager.map(|v| v.id)
    }
}

/// Copy one entity's components out of the world.
pub fn capture_entity(world: &World, entity: Entity) -> SerializableEntity {
    let mut se = SerializableEntity::default();
    let Ok(entity_ref) = world.entity(entity) else {
        return se;
    };

    if let Some(c) = entity_ref.get::<&Villager>() {
        se.villager = Some(*c);
    }
    if let Some(c) = entity_ref.get::<&Name>() {
        se.name = Some((*c).clone());
    }
    if let Some(c) = entity_ref.get::<&Position>() {
        se.position = Some(*c);
    }
    if let Some(c) = entity_ref.get::<&Marriage>() {
        se.marriage = Some(*c);
    }
    if let Some(c) = entity_ref.get::<&Parentage>() {
        se.parentage = Some(*c);
    }
    if let Some(c) = entity_ref.get::<&Carrying>() {
        se.carrying = Some(*c);
    }
    if let Some(behaviors) = entity_ref.get::<&Behaviors>() {
        se.chore = behaviors.chore().copied();
        se.progression = behaviors.progression().map(serialize_progression);
    }

    se
}

/// Spawn an entity with all its components. Returns the entity and any
/// progression record faults.
pub fn restore_entity(
    world: &mut World,
    se: SerializableEntity,
    config: &ProgressionConfig,
) -> (Entity, Vec<ProgressionError>) {
    let entity = world.spawn(());
    let mut faults = Vec::new();

    let mut behaviors = Behaviors::new();
    if let Some(blob) = &se.progression {
        let id = se.id().unwrap_or(VillagerId(0));
        let (state, found) = deserialize_progression(id, blob, config);
        behaviors.insert(BehaviorState::Progression(state));
        faults = found;
    }
    if let Some(chore) = se.chore {
        behaviors.insert(BehaviorState::Chore(chore));
    }

    if let Some(c) = se.villager {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.name {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.position {
        let _ = world.insert_one(entity, c);
    }
    let _ = world.insert_one(entity, se.marriage.unwrap_or_default());
    if let Some(c) = se.parentage {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.carrying {
        let _ = world.insert_one(entity, c);
    }
    let _ = world.insert_one(entity, behaviors);

    (entity, faults)
}

// ── Whole simulation ───────────────────────────────────────────────────

/// Simulation clock and random stream position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    pub tick: u64,
    /// Seed the engine was created with
    pub seed: u64,
    /// Position in the seeded random stream, so a loaded run continues
    /// exactly where the saved one stopped.
    pub rng_word_pos: u128,
    /// Next villager id to hand out
    pub next_id: u64,
}

/// Serializable snapshot of the simulation state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    pub header: SaveHeader,
    pub config: ProgressionConfig,
    /// Events not yet drained by the caller
    pub events: Vec<LifeEvent>,
    /// All villagers with their components
    pub entities: Vec<SerializableEntity>,
}

/// Save the complete simulation to a writer
pub fn save_simulation<W: Write>(
    writer: W,
    world: &World,
    header: SaveHeader,
    config: &ProgressionConfig,
    events: &[LifeEvent],
) -> Result<(), SaveError> {
    let mut entities: Vec<SerializableEntity> = world
        .query::<&Villager>()
        .iter()
        .map(|(entity, _)| capture_entity(world, entity))
        .collect();
    entities.sort_by_key(|se| se.id());

    let save_data = SaveData {
        version: SAVE_VERSION,
        header,
        config: config.clone(),
        events: events.to_vec(),
        entities,
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a simulation from a reader
pub fn load_simulation<R: Read>(reader: R) -> Result<LoadedSimulation, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut world = World::new();
    let mut faults = Vec::new();
    for se in save_data.entities {
        let (_, found) = restore_entity(&mut world, se, &save_data.config);
        faults.extend(found);
    }

    Ok(LoadedSimulation {
        world,
        header: save_data.header,
        config: save_data.config,
        events: save_data.events,
        faults,
    })
}

/// Result of loading a simulation
pub struct LoadedSimulation {
    pub world: World,
    pub header: SaveHeader,
    pub config: ProgressionConfig,
    pub events: Vec<LifeEvent>,
    /// Progression record fields that had to be defaulted
    pub faults: Vec<ProgressionError>,
}

/// Errors that can occur during save/load
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),

    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProgressionConfig {
        ProgressionConfig {
            initial_cooldown_ticks: 33,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_uses_documented_keys() {
        let state = ProgressionState {
            step: ProgressionStep::Gestating,
            cooldown_ticks: 5,
            is_dominant: false,
            gestation_age: 2,
            child_count: 3,
        };
        let value: Value = serde_json::from_str(&serialize_progression(&state)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "step": 3,
                "cooldownTicks": 5,
                "isDominant": false,
                "gestationAge": 2,
                "childCount": 3
            })
        );

        let (back, faults) = deserialize_progression(VillagerId(1), &value.to_string(), &config());
        assert_eq!(back, state);
        assert!(faults.is_empty());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let (state, faults) = deserialize_progression(VillagerId(4), "{}", &config());
        assert_eq!(state.step, ProgressionStep::SearchingForPartner);
        assert_eq!(state.cooldown_ticks, 33);
        assert!(state.is_dominant);
        assert_eq!(state.gestation_age, 0);
        assert_eq!(state.child_count, 0);
        assert_eq!(faults.len(), 5);
        assert!(faults.iter().all(|f| matches!(
            f,
            ProgressionError::PersistenceCorruption { villager: VillagerId(4), .. }
        )));
    }

    #[test]
    fn test_unrecognized_step_becomes_unknown() {
        let blob = r#"{"step":17,"cooldownTicks":1,"isDominant":true,"gestationAge":0,"childCount":1}"#;
        let (state, faults) = deserialize_progression(VillagerId(2), blob, &config());
        assert_eq!(state.step, ProgressionStep::Unknown);
        assert_eq!(state.child_count, 1);
        assert_eq!(faults.len(), 1);
    }

    #[test]
    fn test_bad_field_keeps_the_rest() {
        let blob = r#"{"step":2,"cooldownTicks":-4,"isDominant":"yes","gestationAge":0,"childCount":2}"#;
        let (state, faults) = deserialize_progression(VillagerId(2), blob, &config());
        assert_eq!(state.step, ProgressionStep::AttemptingConception);
        assert_eq!(state.cooldown_ticks, 33);
        assert!(state.is_dominant);
        assert_eq!(state.child_count, 2);
        assert_eq!(faults.len(), 2);
    }

    #[test]
    fn test_garbage_record_is_fully_defaulted() {
        let (state, faults) = deserialize_progression(VillagerId(2), "not json", &config());
        assert!(state.is_default(&config()));
        assert_eq!(faults.len(), 6);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let save_data = SaveData {
            version: SAVE_VERSION + 1,
            header: SaveHeader {
                tick: 0,
                seed: 0,
                rng_word_pos: 0,
                next_id: 1,
            },
            config: config(),
            events: Vec::new(),
            entities: Vec::new(),
        };
        let bytes = bincode::serialize(&save_data).unwrap();
        match load_simulation(&bytes[..]) {
            Err(SaveError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, SAVE_VERSION + 1);
            }
            _ => panic!("expected a version mismatch"),
        }
    }

    #[test]
    fn test_entity_snapshot_roundtrip() {
        let mut world = World::new();
        let state = ProgressionState::new(&config());
        let behaviors = Behaviors::new()
            .with(BehaviorState::Progression(state))
            .with(BehaviorState::Chore(ChoreSlot {
                chore: Some(ChoreKind::Hunting),
                active: true,
            }));
        let entity = world.spawn((
            Villager::adult(VillagerId(6), Gender::Female),
            Name::new("Nell", "Brook"),
            Position::new(1.0, 2.0, 3.0),
            Marriage::married_to(VillagerId(7)),
            Carrying {
                child_gender: Gender::Male,
            },
            behaviors.clone(),
        ));

        let snapshot = capture_entity(&world, entity);
        assert_eq!(snapshot.id(), Some(VillagerId(6)));

        let mut other = World::new();
        let (restored, faults) = restore_entity(&mut other, snapshot, &config());
        assert!(faults.is_empty());
        assert_eq!(*other.get::<&Behaviors>(restored).unwrap(), behaviors);
        assert_eq!(
            *other.get::<&Marriage>(restored).unwrap(),
            Marriage::married_to(VillagerId(7))
        );
        assert!(other.get::<&Carrying>(restored).is_ok());
        assert!(other.get::<&Parentage>(restored).is_err());
    }
}
