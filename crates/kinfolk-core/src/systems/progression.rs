//! Progression controller - per-tick gating and dispatch of the paired
//! life-cycle transitions.
//!
//! Each agent is evaluated in ascending id order. A transition reads copies
//! of both sides, plans the outcome with the pure planners in
//! `kinfolk_logic::transitions`, then writes each side back in turn before
//! the next agent is evaluated. Nothing else observes a half-written pair.
//!
//! A pair advances at most one step per tick: once a transition has written
//! both sides, neither side is evaluated again until the next tick.

use hecs::{Entity, World};
use rand::Rng;
use std::collections::HashSet;

use kinfolk_logic::config::ProgressionConfig;
use kinfolk_logic::events::LifeEvent;
use kinfolk_logic::gates::{run_gates, AgentClock, Gate};
use kinfolk_logic::kinship::{is_eligible_partner, CandidateView};
use kinfolk_logic::progression::{ProgressionState, ProgressionStep};
use kinfolk_logic::transitions::{
    advance_gestation, carrying_side, conception_succeeds, continues_cycle, plan_birth,
    plan_conception, plan_pairing, Side,
};

use super::lifecycle::{spawn_child, spawn_villager, VillagerSpec};
use super::mate::{resolve_mate, ResolvedMate};
use crate::components::*;
use crate::error::{ProgressionError, Result};
use crate::generation::generate_name;
use crate::registry::VillagerRegistry;

/// Run the controller once for every loaded villager holding a progression
/// state. Returns the recoverable faults hit along the way, already logged.
///
/// `stranded` carries, across ticks, the villagers whose mate was unreachable
/// on their last attempt. Only the first miss of a run is logged as a warning.
pub fn progression_system(
    world: &mut World,
    registry: &mut VillagerRegistry,
    config: &ProgressionConfig,
    rng: &mut impl Rng,
    tick: u64,
    events: &mut Vec<LifeEvent>,
    stranded: &mut HashSet<VillagerId>,
) -> Vec<ProgressionError> {
    let mut controller = Controller {
        world,
        registry,
        config,
        rng,
        tick,
        events,
        stranded,
        settled: HashSet::new(),
    };

    let mut faults = Vec::new();
    for id in controller.registry.sorted_ids() {
        if let Err(fault) = controller.evaluate(id) {
            faults.push(fault);
        }
    }
    faults
}

/// Write `state` into the progression slot of `entity`.
pub(crate) fn store_progression(world: &World, entity: Entity, state: ProgressionState) -> bool {
    match world.get::<&mut Behaviors>(entity) {
        Ok(mut behaviors) => match behaviors.progression_mut() {
            Some(slot) => {
                *slot = state;
                true
            }
            None => false,
        },
        Err(_) => false,
    }
}

/// Acting agent's side, copied out of the world at the start of its turn.
#[derive(Debug, Clone, Copy)]
struct Actor {
    id: VillagerId,
    entity: Entity,
    gender: Gender,
    marriage: Marriage,
    position: Option<Position>,
    parentage: Option<Parentage>,
}

struct Controller<'a, R: Rng> {
    world: &'a mut World,
    registry: &'a mut VillagerRegistry,
    config: &'a ProgressionConfig,
    rng: &'a mut R,
    tick: u64,
    events: &'a mut Vec<LifeEvent>,
    stranded: &'a mut HashSet<VillagerId>,
    /// Villagers already moved by a transition this tick.
    settled: HashSet<VillagerId>,
}

impl<'a, R: Rng> Controller<'a, R> {
    fn evaluate(&mut self, id: VillagerId) -> Result<()> {
        if self.settled.contains(&id) {
            return Ok(());
        }
        let Some(entity) = self.registry.entity(id) else {
            return Ok(());
        };
        let Some((actor, clock, before)) = self.read_actor(id, entity) else {
            return Ok(());
        };

        let mut state = before;
        let gate = run_gates(&mut state, clock, self.config, self.rng);
        let step = match gate {
            Gate::Act(step) => step,
            Gate::CoolingDown { .. } | Gate::Declined => {
                store_progression(self.world, entity, state);
                log::trace!("{} gated: {:?}", id, gate);
                return Ok(());
            }
            _ => return Ok(()),
        };

        // The gate's cooldown reset sticks unless the mate was unreachable.
        store_progression(self.world, entity, state);

        let result = match step {
            ProgressionStep::SearchingForPartner => self.search_for_partner(&actor, state),
            ProgressionStep::AttemptingConception => self.attempt_conception(&actor, state),
            ProgressionStep::Gestating => self.gestate(&actor, state),
            ProgressionStep::Finished | ProgressionStep::Unknown => Ok(()),
        };

        match result {
            Ok(()) => {
                self.stranded.remove(&id);
                Ok(())
            }
            Err(fault @ ProgressionError::MateUnavailable { .. }) => {
                // Nothing is consumed, so the next tick rolls again.
                store_progression(self.world, entity, before);
                if self.stranded.insert(id) {
                    log::warn!("{} {:?} aborted: {}", id, step, fault);
                } else {
                    log::debug!("{} {:?} still aborted: {}", id, step, fault);
                }
                Err(fault)
            }
            Err(fault) => {
                log::warn!("{}", fault);
                Err(fault)
            }
        }
    }

    fn read_actor(
        &self,
        id: VillagerId,
        entity: Entity,
    ) -> Option<(Actor, AgentClock, ProgressionState)> {
        let entity_ref = self.world.entity(entity).ok()?;
        let villager = *entity_ref.get::<&Villager>()?;
        let state = entity_ref.get::<&Behaviors>()?.progression().copied()?;
        let actor = Actor {
            id,
            entity,
            gender: villager.gender,
            marriage: entity_ref.get::<&Marriage>().map(|m| *m).unwrap_or_default(),
            position: entity_ref.get::<&Position>().map(|p| *p),
            parentage: entity_ref.get::<&Parentage>().map(|p| *p),
        };
        let clock = AgentClock {
            ticks_alive: villager.ticks_alive,
            is_child: villager.is_child,
        };
        Some((actor, clock, state))
    }

    fn resolve(&self, actor: &Actor, spouse: VillagerId) -> Result<ResolvedMate> {
        resolve_mate(self.world, self.registry, actor.id, spouse)
    }

    fn commit(
        &mut self,
        actor: &Actor,
        state: ProgressionState,
        mate: Option<(&ResolvedMate, ProgressionState)>,
    ) {
        store_progression(self.world, actor.entity, state);
        self.settled.insert(actor.id);
        if let Some((mate, mate_state)) = mate {
            store_progression(self.world, mate.entity, mate_state);
            self.settled.insert(mate.id);
        }
    }

    fn set_marriage(&self, entity: Entity, marriage: Marriage) {
        if let Ok(mut slot) = self.world.get::<&mut Marriage>(entity) {
            *slot = marriage;
        }
    }

    // ── SearchingForPartner ────────────────────────────────────────────

    fn search_for_partner(&mut self, actor: &Actor, state: ProgressionState) -> Result<()> {
        // Already bound but not yet paired: take up the existing spouse.
        let mate = match actor.marriage.partner() {
            Some(spouse) => {
                let mate = self.resolve(actor, spouse)?;
                if mate.carrying || mate.state.step == ProgressionStep::Gestating {
                    return Err(ProgressionError::invalid(
                        actor.id,
                        ProgressionStep::SearchingForPartner,
                        format!("spouse {} is still carrying", mate.id),
                    ));
                }
                mate
            }
            None => match self.nearest_candidate(actor) {
                Some(candidate) => candidate,
                None => {
                    log::debug!("{} found no partner in range", actor.id);
                    return Ok(());
                }
            },
        };

        let outcome = plan_pairing(&state, actor.gender, &mate.state, mate.gender);
        let mate_state = outcome.mate.unwrap_or(mate.state);

        self.set_marriage(actor.entity, Marriage::married_to(mate.id));
        self.set_marriage(mate.entity, Marriage::married_to(actor.id));
        self.commit(actor, outcome.actor, Some((&mate, mate_state)));

        log::info!("{} and {} paired up", actor.id, mate.id);
        self.events.push(LifeEvent::PartnerFound {
            tick: self.tick,
            a: actor.id,
            b: mate.id,
        });
        Ok(())
    }

    /// Nearest eligible villager within the search radius. Ties go to the
    /// lower id.
    fn nearest_candidate(&self, actor: &Actor) -> Option<ResolvedMate> {
        let origin = actor.position?;
        let seeker = CandidateView {
            id: actor.id,
            gender: actor.gender,
            is_child: false,
            status: actor.marriage.status,
            parentage: actor.parentage,
            has_progression: true,
            is_pregnant: false,
        };

        let mut best: Option<(f32, ResolvedMate)> = None;
        let mut query = self.world.query::<(
            &Villager,
            &Marriage,
            &Position,
            &Behaviors,
            Option<&Parentage>,
            Option<&Carrying>,
        )>();
        for (entity, (villager, marriage, position, behaviors, parentage, carrying)) in query.iter() {
            let distance = origin.distance(position);
            if distance > self.config.partner_search_radius {
                continue;
            }
            let progression = behaviors.progression().copied();
            let candidate = CandidateView {
                id: villager.id,
                gender: villager.gender,
                is_child: villager.is_child,
                status: marriage.status,
                parentage: parentage.copied(),
                has_progression: progression.is_some(),
                is_pregnant: carrying.is_some()
                    || progression.is_some_and(|p| p.step == ProgressionStep::Gestating),
            };
            if !is_eligible_partner(&seeker, &candidate, self.config.sibling_rule) {
                continue;
            }
            let Some(state) = progression else {
                continue;
            };

            let closer = match &best {
                None => true,
                Some((d, current)) => distance < *d || (distance == *d && villager.id < current.id),
            };
            if closer {
                best = Some((
                    distance,
                    ResolvedMate {
                        id: villager.id,
                        entity,
                        gender: villager.gender,
                        position: Some(*position),
                        carrying: carrying.is_some(),
                        state,
                    },
                ));
            }
        }
        best.map(|(_, mate)| mate)
    }

    // ── AttemptingConception ───────────────────────────────────────────

    fn attempt_conception(&mut self, actor: &Actor, state: ProgressionState) -> Result<()> {
        let step = ProgressionStep::AttemptingConception;
        if actor.marriage.status != MaritalStatus::Married {
            return Err(ProgressionError::invalid(actor.id, step, "not married"));
        }
        let Some(spouse) = actor.marriage.spouse else {
            return Err(ProgressionError::invalid(actor.id, step, "married without a spouse id"));
        };
        let mate = self.resolve(actor, spouse)?;

        let distance = match (actor.position, mate.position) {
            (Some(a), Some(b)) => a.distance(&b),
            _ => f32::INFINITY,
        };
        if !conception_succeeds(distance, self.config, self.rng) {
            log::debug!("{} and {} did not conceive (distance {:.1})", actor.id, mate.id, distance);
            return Ok(());
        }

        let carrier = carrying_side(actor.gender, mate.gender);
        let outcome = plan_conception(&state, &mate.state, carrier);
        let mate_state = outcome.mate.unwrap_or(mate.state);

        let (carrier_id, carrier_entity, partner_id) = match carrier {
            Side::Actor => (actor.id, actor.entity, mate.id),
            Side::Mate => (mate.id, mate.entity, actor.id),
        };
        let child_gender = Gender::random(self.rng);
        let _ = self.world.insert_one(carrier_entity, Carrying { child_gender });
        self.commit(actor, outcome.actor, Some((&mate, mate_state)));

        log::info!(
            "{} conceived with {} (child {} of the pair)",
            carrier_id,
            partner_id,
            mate_state.child_count
        );
        self.events.push(LifeEvent::ConceptionSucceeded {
            tick: self.tick,
            carrier: carrier_id,
            partner: partner_id,
        });
        Ok(())
    }

    // ── Gestating ──────────────────────────────────────────────────────

    fn gestate(&mut self, actor: &Actor, state: ProgressionState) -> Result<()> {
        let mut state = state;
        if !advance_gestation(&mut state, self.config) {
            store_progression(self.world, actor.entity, state);
            return Ok(());
        }

        // Birth goes ahead without the mate; only the loop needs it.
        let spouse = actor.marriage.partner();
        let mate = match spouse {
            Some(spouse) => match self.resolve(actor, spouse) {
                Ok(mate) => Some(mate),
                Err(fault) => {
                    log::debug!("{} giving birth without mate: {}", actor.id, fault);
                    None
                }
            },
            None => None,
        };

        let again = continues_cycle(state.child_count, mate.is_some(), self.config, self.rng);

        let carried_gender = self
            .world
            .remove_one::<Carrying>(actor.entity)
            .map(|c| c.child_gender)
            .ok();
        let child_gender = match carried_gender {
            Some(gender) => gender,
            None => Gender::random(self.rng),
        };

        let position = actor.position.unwrap_or_default();
        let child = match spouse {
            Some(spouse) => {
                let (father, mother) = match actor.gender {
                    Gender::Female => (spouse, actor.id),
                    Gender::Male => (actor.id, spouse),
                };
                spawn_child(
                    self.world,
                    self.registry,
                    self.config,
                    self.rng,
                    father,
                    mother,
                    position,
                    child_gender,
                )
            }
            None => {
                let spec = VillagerSpec {
                    position,
                    name: Some(generate_name(child_gender, self.rng)),
                    ..VillagerSpec::child(child_gender)
                };
                spawn_villager(self.world, self.registry, self.config, spec)
            }
        };

        let outcome = plan_birth(&state, mate.as_ref().map(|m| &m.state), again);
        let mate_side = match (&mate, outcome.mate) {
            (Some(mate), Some(mate_state)) => Some((mate, mate_state)),
            _ => None,
        };
        self.commit(actor, outcome.actor, mate_side);

        log::info!("{} gave birth to {} (continuing: {})", actor.id, child, again);
        match spouse {
            Some(partner) => self.events.push(LifeEvent::ChildBorn {
                tick: self.tick,
                carrier: actor.id,
                partner,
                child,
            }),
            None => log::warn!("{} gave birth with no spouse on record", actor.id),
        }
        Ok(())
    }
}
