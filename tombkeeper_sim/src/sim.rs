// Tick driver and save/load.
//
// `SimState` owns everything the AI core needs between ticks: the tick
// counter, the `GameRng`, the `GameConfig`, the flip state, the enemy (the
// player, as the creatures see it) and every creature, keyed by
// `CreatureId`. The box graph and sector grid belong to the level and are
// `#[serde(skip)]`; the level hands them back through
// `rebuild_transient_state()` after a load.
//
// ## Per-tick pipeline
//
// `step()` visits creatures in id order. Dead creatures and creatures
// outside every box are skipped. For everyone else:
//
//   1. `AiInfo::compute()` takes the perception snapshot;
//   2. `update_mood()` runs the FSM, the search budget and the target clamp;
//   3. `turn_toward_target()` yaws toward the steering point and
//      `track_head()` follows the enemy while it's ahead;
//   4. `animate_creature()` moves and reconciles, keeping clear of the other
//      living creatures where they stand now (earlier creatures in the
//      order have already moved this tick);
//   5. the hit flag is cleared.
//
// Each processed creature yields a `TickReport` for diagnostics.
//
// ## Save/load
//
// Only head-level creature state is persisted (species, position, yaw,
// room, health). Mood, search state and steering are reset on load, so a
// restored creature starts Bored with a fresh search.
//
// See also: `creature.rs` for `CreatureInfo`, `mood.rs` and `movement.rs` for
// the pipeline stages, `config.rs` for `GameConfig`.
//
// **Critical constraint: determinism.** Creatures are processed in
// `BTreeMap` order and draw from the single sim-owned `GameRng`. No external
// input (system time, thread state, etc.) may influence a tick.

use crate::config::GameConfig;
use crate::creature::{AiContext, CreatureInfo};
use crate::error::AiError;
use crate::lot::SteeringTarget;
use crate::mood::{Mood, QuadrantHeuristics, update_mood};
use crate::movement::{MoveIntent, MoveOutcome, animate_creature};
use crate::nav::BoxGraph;
use crate::perception::{AiInfo, Enemy};
use crate::prng::GameRng;
use crate::sector::{SectorGrid, SectorQuery};
use crate::types::{Angle, BoxId, CreatureId, FlipState, RoomId, SpeciesId, WorldPos};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// The whole AI-side world.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimState {
    /// Ticks run so far.
    pub tick: u64,

    pub rng: GameRng,

    pub config: GameConfig,

    pub flip: FlipState,

    pub enemy: Enemy,

    /// Keyed by ID. BTreeMap for deterministic iteration.
    pub creatures: BTreeMap<CreatureId, CreatureInfo>,

    next_creature_id: u32,

    /// Level geometry. Supplied by the level, not serialized.
    #[serde(skip)]
    pub graph: BoxGraph,

    /// Level sector data. Supplied by the level, not serialized.
    #[serde(skip)]
    pub sectors: SectorGrid,
}

/// What one creature did in one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub creature: CreatureId,
    pub mood_before: Mood,
    pub mood_after: Mood,
    pub steering: SteeringTarget,
    pub outcome: MoveOutcome,
}

impl SimState {
    pub fn new(
        config: GameConfig,
        graph: BoxGraph,
        sectors: SectorGrid,
        enemy: Enemy,
        seed: u64,
    ) -> Self {
        Self {
            tick: 0,
            rng: GameRng::new(seed),
            config,
            flip: FlipState::Base,
            enemy,
            creatures: BTreeMap::new(),
            next_creature_id: 0,
            graph,
            sectors,
        }
    }

    fn ctx(&self) -> AiContext<'_> {
        AiContext {
            graph: &self.graph,
            sectors: &self.sectors,
            flip: self.flip,
            tuning: &self.config.ai,
        }
    }

    /// Add a creature of `species` at `pos`. Fails if the species has no
    /// configuration.
    pub fn spawn_creature(
        &mut self,
        species: SpeciesId,
        pos: WorldPos,
        yaw: Angle,
    ) -> Result<CreatureId, AiError> {
        let data = self.config.species(species)?;
        let id = CreatureId(self.next_creature_id);
        let creature = CreatureInfo::new(id, species, data, &self.ctx(), pos, yaw);
        debug!(
            creature = %id,
            species = %species,
            name = %data.name,
            pos = %pos,
            box_id = ?creature.box_id,
            "creature_spawned"
        );
        self.creatures.insert(id, creature);
        self.next_creature_id += 1;
        Ok(id)
    }

    pub fn creature(&self, id: CreatureId) -> Result<&CreatureInfo, AiError> {
        self.creatures.get(&id).ok_or(AiError::UnknownCreature(id))
    }

    /// Reduce a creature's health and mark it hit for the next tick.
    pub fn damage_creature(&mut self, id: CreatureId, amount: i32) -> Result<(), AiError> {
        let creature = self
            .creatures
            .get_mut(&id)
            .ok_or(AiError::UnknownCreature(id))?;
        creature.health -= amount;
        creature.hit_this_tick = true;
        debug!(creature = %id, amount, health = creature.health, "creature_damaged");
        Ok(())
    }

    /// Move the enemy, re-resolving its box from the sector data.
    pub fn place_enemy(&mut self, pos: WorldPos, yaw: Angle) {
        let sector = self.sectors.sector_at(pos.x, pos.y, pos.z, RoomId::default());
        self.enemy.pos = pos;
        self.enemy.yaw = yaw;
        self.enemy.box_id = sector.box_id;
    }

    /// Switch room sets. Every creature's search is restarted under the new
    /// zone tables.
    pub fn set_flip(&mut self, flip: FlipState) {
        if flip == self.flip {
            return;
        }
        self.flip = flip;
        let box_count = self.graph.box_count();
        for creature in self.creatures.values_mut() {
            creature.lot.reset(box_count);
            creature.lot.rebuild_zone(&self.graph, creature.box_id, flip);
        }
        debug!(flip = ?flip, "flip_changed");
    }

    /// Open or close a blockable box (a door, a trapdoor).
    pub fn set_box_blocked(&mut self, id: BoxId, blocked: bool) -> Result<(), AiError> {
        let count = self.graph.box_count();
        if id.index() >= count {
            return Err(AiError::BoxOutOfRange {
                index: id.index(),
                count,
            });
        }
        self.graph.set_blocked(id, blocked);
        Ok(())
    }

    /// Run one tick of the AI pipeline for every creature.
    ///
    /// Fails without touching any state if a living creature's species has
    /// no configuration.
    pub fn step(&mut self) -> Result<Vec<TickReport>, AiError> {
        for creature in self.creatures.values().filter(|c| c.health > 0) {
            self.config.species(creature.species_id)?;
        }
        self.tick += 1;
        let heuristics = QuadrantHeuristics::from_tuning(&self.config.ai);
        let ids: Vec<CreatureId> = self.creatures.keys().copied().collect();
        let mut reports = Vec::with_capacity(ids.len());

        for id in ids {
            // Creatures earlier in this tick have already moved.
            let others: Vec<WorldPos> = self
                .creatures
                .values()
                .filter(|c| c.id != id && c.health > 0)
                .map(|c| c.pos)
                .collect();
            let ctx = AiContext {
                graph: &self.graph,
                sectors: &self.sectors,
                flip: self.flip,
                tuning: &self.config.ai,
            };
            let Some(creature) = self.creatures.get_mut(&id) else {
                continue;
            };
            if creature.health <= 0 {
                trace!(creature = %id, "creature_skipped: dead");
                continue;
            }
            let species = self.config.species(creature.species_id)?;
            let Some(info) = AiInfo::compute(ctx.graph, ctx.flip, creature, species, &self.enemy)
            else {
                trace!(creature = %id, "creature_skipped: no box");
                creature.hit_this_tick = false;
                continue;
            };

            let mood_before = creature.mood;
            let steering = update_mood(
                &ctx,
                species,
                &self.enemy,
                &heuristics,
                creature,
                &info,
                &mut self.rng,
            );
            let turn = creature.turn_toward_target(species.speed, species.max_turn);
            let head = if info.ahead { info.angle } else { Angle::ZERO };
            creature.track_head(head, ctx.tuning);

            let intent = MoveIntent {
                speed: species.speed,
                turn,
                tilt: turn,
            };
            let outcome = animate_creature(&ctx, creature, species, intent, &others);
            creature.hit_this_tick = false;

            reports.push(TickReport {
                creature: id,
                mood_before,
                mood_after: creature.mood,
                steering,
                outcome,
            });
        }

        Ok(reports)
    }

    /// Restore the level data and rebuild every creature's non-persisted AI
    /// state after deserialization.
    pub fn rebuild_transient_state(
        &mut self,
        graph: BoxGraph,
        sectors: SectorGrid,
    ) -> Result<(), AiError> {
        self.graph = graph;
        self.sectors = sectors;
        let ctx = AiContext {
            graph: &self.graph,
            sectors: &self.sectors,
            flip: self.flip,
            tuning: &self.config.ai,
        };
        for creature in self.creatures.values_mut() {
            let species = self.config.species(creature.species_id)?;
            creature.reset_ai(species, &ctx);
        }
        let pos = self.enemy.pos;
        self.enemy.box_id = self
            .sectors
            .sector_at(pos.x, pos.y, pos.z, RoomId::default())
            .box_id;
        Ok(())
    }

    /// Serialize the persisted part of the state to a JSON string.
    pub fn to_json(&self) -> Result<String, AiError> {
        serde_json::to_string(self).map_err(AiError::State)
    }

    /// Deserialize a saved state and rebuild transient fields from the
    /// level's graph and sectors.
    pub fn from_json(json: &str, graph: BoxGraph, sectors: SectorGrid) -> Result<Self, AiError> {
        let mut state: SimState = serde_json::from_str(json).map_err(AiError::State)?;
        state.rebuild_transient_state(graph, sectors)?;
        Ok(state)
    }
}
