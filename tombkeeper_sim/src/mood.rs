// Mood state machine and goal selection.
//
// Each tick `update_mood()` moves a creature between four moods (`Bored`,
// `Stalk`, `Attack`, `Escape`) based on its `AiInfo` snapshot, then picks a
// goal box for the new mood and resolves this tick's steering point.
//
// ## Transitions
//
// A dead enemy or a dead creature forces `Bored`. Otherwise:
//
// - **Violent** species attack whenever the enemy's zone matches their own,
//   flee when hit while unable to reach it, and give up an attack when the
//   zones diverge.
// - **Non-violent** species flee when hit (always if the enemy is out of
//   reach, sometimes even when it isn't), attack only when close or when a
//   stalk has run out of places to go, and otherwise stalk. Fleeing
//   creatures occasionally calm down into stalking.
//
// Leaving `Attack` re-randomizes the goal inside the current target box;
// every change clears `required_box` so the next pick starts fresh.
//
// ## Goal selection
//
// `Attack` re-aims at the enemy with probability `target_update_chance`.
// The other moods sample one random box from the creature's zone list and
// accept it only if it is a valid box (same zone, not blocked, not the box
// the creature stands in) and the mood's heuristic likes it. Stalk and
// escape heuristics live behind `TargetHeuristics`; `QuadrantHeuristics` is
// the default, judging boxes by which side of the enemy they lie on.
//
// After selection the creature always has a `target_box` (its own box if
// nothing else), the search gets one budgeted `update_path()`, and
// `calculate_target()` produces the steering point.
//
// See also: `perception.rs` for `AiInfo`, `lot.rs` for the search and clamp,
// `config.rs` for the chances and distances in `AiTuning`.
//
// **Critical constraint: determinism.** Every random draw comes from the
// injected `GameRng`, in a fixed order per branch.

use crate::config::AiTuning;
use crate::creature::{AiContext, CreatureInfo};
use crate::error::AiError;
use crate::lot::SteeringTarget;
use crate::nav::BoxGraph;
use crate::perception::{AiInfo, Enemy};
use crate::prng::GameRng;
use crate::species::SpeciesData;
use crate::types::{BoxId, WorldPos, ZoneId};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use tracing::{debug, trace};

/// A creature's behavioral goal.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Mood {
    #[default]
    Bored,
    Stalk,
    Attack,
    Escape,
}

impl TryFrom<u8> for Mood {
    type Error = AiError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mood::Bored),
            1 => Ok(Mood::Stalk),
            2 => Ok(Mood::Attack),
            3 => Ok(Mood::Escape),
            other => Err(AiError::InvalidMood(other)),
        }
    }
}

impl From<Mood> for u8 {
    fn from(mood: Mood) -> u8 {
        match mood {
            Mood::Bored => 0,
            Mood::Stalk => 1,
            Mood::Attack => 2,
            Mood::Escape => 3,
        }
    }
}

/// Judges candidate boxes for stalking and fleeing.
pub trait TargetHeuristics {
    /// Whether `candidate` is a good spot to shadow the enemy from.
    fn is_stalkable(
        &self,
        graph: &BoxGraph,
        creature_pos: WorldPos,
        enemy: &Enemy,
        candidate: BoxId,
    ) -> bool;

    /// Whether `candidate` takes the creature away from the enemy.
    fn is_escapable(
        &self,
        graph: &BoxGraph,
        creature_pos: WorldPos,
        enemy: &Enemy,
        candidate: BoxId,
    ) -> bool;
}

/// Quadrant-based heuristics: a stalk box is near the enemy but not in
/// front of it; an escape box is far from the enemy and not on the far
/// side of it.
#[derive(Clone, Copy, Debug)]
pub struct QuadrantHeuristics {
    pub stalk_distance: i32,
    pub escape_distance: i32,
}

impl QuadrantHeuristics {
    pub fn from_tuning(tuning: &AiTuning) -> Self {
        Self {
            stalk_distance: tuning.stalk_distance,
            escape_distance: tuning.escape_distance,
        }
    }
}

/// Quadrant (0..=3) of offset `(dx, dz)`, numbered like `Angle::quadrant`.
fn offset_quadrant(dx: i32, dz: i32) -> i32 {
    match (dz > 0, dx > 0) {
        (true, true) => 2,
        (true, false) => 1,
        (false, true) => 3,
        (false, false) => 0,
    }
}

impl TargetHeuristics for QuadrantHeuristics {
    fn is_stalkable(
        &self,
        graph: &BoxGraph,
        creature_pos: WorldPos,
        enemy: &Enemy,
        candidate: BoxId,
    ) -> bool {
        let b = graph.nav_box(candidate);
        let (cx, cz) = b.center();
        let dx = cx - enemy.pos.x;
        let dz = cz - enemy.pos.z;
        let x_range = self.stalk_distance + (b.x_max - b.x_min);
        let z_range = self.stalk_distance + (b.z_max - b.z_min);
        if dx.abs() > x_range || dz.abs() > z_range {
            return false;
        }

        // Not straight in front of the enemy.
        let enemy_quad = enemy.yaw.quadrant();
        let box_quad = offset_quadrant(dx, dz);
        if enemy_quad == box_quad {
            return false;
        }

        // Not across the enemy's path when the creature is in front.
        let creature_quad =
            offset_quadrant(creature_pos.x - enemy.pos.x, creature_pos.z - enemy.pos.z);
        !(enemy_quad == creature_quad && (enemy_quad - box_quad).abs() == 2)
    }

    fn is_escapable(
        &self,
        graph: &BoxGraph,
        creature_pos: WorldPos,
        enemy: &Enemy,
        candidate: BoxId,
    ) -> bool {
        let (cx, cz) = graph.nav_box(candidate).center();
        let dx = cx - enemy.pos.x;
        let dz = cz - enemy.pos.z;
        if dx.abs() < self.escape_distance && dz.abs() < self.escape_distance {
            return false;
        }
        let flips_z = (dz > 0) != (creature_pos.z > enemy.pos.z);
        let flips_x = (dx > 0) != (creature_pos.x > enemy.pos.x);
        !(flips_z && flips_x)
    }
}

/// Whether `candidate` is worth heading for: same zone as the creature,
/// passable, and not the box the creature already stands in.
pub fn valid_box(
    ctx: &AiContext<'_>,
    creature: &CreatureInfo,
    zone: ZoneId,
    candidate: BoxId,
) -> bool {
    let lot = &creature.lot;
    let b = ctx.graph.nav_box(candidate);
    ctx.graph.zone(candidate, lot.class, ctx.flip) == zone
        && !b.flags.intersects(lot.block_mask)
        && !b.contains(creature.pos.x, creature.pos.z)
}

/// Sample one box from the creature's zone list; `None` if the draw isn't
/// a valid box. Always consumes one draw when the list is non-empty.
fn pick_valid_box(
    ctx: &AiContext<'_>,
    creature: &CreatureInfo,
    zone: ZoneId,
    rng: &mut GameRng,
) -> Option<BoxId> {
    let boxes = creature.lot.zone_boxes();
    if boxes.is_empty() {
        return None;
    }
    let index = rng.scaled(boxes.len() as i32) as usize;
    boxes
        .get(index)
        .copied()
        .filter(|&candidate| valid_box(ctx, creature, zone, candidate))
}

/// The transition for this tick, before goal selection.
fn next_mood(
    ctx: &AiContext<'_>,
    creature: &CreatureInfo,
    info: &AiInfo,
    violent: bool,
    enemy: &Enemy,
    rng: &mut GameRng,
) -> Mood {
    let mood = creature.mood;
    if enemy.health <= 0 || creature.health <= 0 {
        return Mood::Bored;
    }
    let zones_match = info.zones_match();
    let hit = creature.hit_this_tick;
    let tuning = ctx.tuning;

    if violent {
        return match mood {
            Mood::Bored | Mood::Stalk if zones_match => Mood::Attack,
            Mood::Bored | Mood::Stalk if hit => Mood::Escape,
            Mood::Attack if !zones_match => Mood::Bored,
            Mood::Escape if zones_match => Mood::Attack,
            unchanged => unchanged,
        };
    }

    match mood {
        Mood::Bored | Mood::Stalk => {
            if hit && (rng.chance(tuning.escape_chance) || !zones_match) {
                Mood::Escape
            } else if zones_match {
                let range = i64::from(tuning.attack_range);
                if info.distance < range * range
                    || (mood == Mood::Stalk && creature.lot.required_box.is_none())
                {
                    Mood::Attack
                } else {
                    Mood::Stalk
                }
            } else {
                mood
            }
        }
        Mood::Attack => {
            if hit && (rng.chance(tuning.escape_chance) || !zones_match) {
                Mood::Escape
            } else if !zones_match {
                Mood::Bored
            } else {
                mood
            }
        }
        Mood::Escape => {
            if zones_match && rng.chance(tuning.recover_chance) {
                Mood::Stalk
            } else {
                mood
            }
        }
    }
}

/// Run the mood FSM for one creature and resolve its steering point.
///
/// Updates `creature.mood`, the creature's search goal, and
/// `creature.target`. A creature outside every box keeps its previous
/// target.
pub fn update_mood(
    ctx: &AiContext<'_>,
    species: &SpeciesData,
    enemy: &Enemy,
    heuristics: &dyn TargetHeuristics,
    creature: &mut CreatureInfo,
    info: &AiInfo,
    rng: &mut GameRng,
) -> SteeringTarget {
    let Some(creature_box) = creature.box_id else {
        trace!(creature = %creature.id, "mood_skipped: no box");
        return creature.last_steering();
    };
    let graph = ctx.graph;

    // Drop goals the search has proven unusable.
    if creature.lot.is_tombstoned_now(creature_box) {
        creature.lot.required_box = None;
    }
    if creature.mood != Mood::Attack
        && creature.lot.required_box.is_some()
        && !creature
            .lot
            .target_box
            .is_some_and(|b| valid_box(ctx, creature, info.zone, b))
    {
        if info.zones_match() {
            creature.mood = Mood::Bored;
        }
        creature.lot.required_box = None;
    }

    let previous = creature.mood;
    creature.mood = next_mood(ctx, creature, info, species.violent, enemy, rng);
    if creature.mood != previous {
        debug!(
            creature = %creature.id,
            from = %previous,
            to = %creature.mood,
            "mood_change"
        );
        if let Some(target_box) = creature.lot.target_box.filter(|_| previous == Mood::Attack) {
            creature.lot.set_random_search_target(graph, target_box, rng);
        }
        creature.lot.required_box = None;
    }

    let zones_match = info.zones_match();
    let creature_pos = creature.pos;
    match creature.mood {
        Mood::Attack => {
            if rng.chance(species.target_update_chance) {
                creature.lot.target = enemy.pos;
                if creature.lot.limits.is_flying() {
                    creature.lot.target.y += enemy.aim_height;
                }
                if enemy.box_id.is_some() {
                    creature.lot.required_box = enemy.box_id;
                }
            }
        }
        Mood::Bored => {
            if let Some(candidate) = pick_valid_box(ctx, creature, info.zone, rng) {
                if heuristics.is_stalkable(graph, creature_pos, enemy, candidate) {
                    creature.lot.set_random_search_target(graph, candidate, rng);
                    creature.mood = Mood::Stalk;
                } else if creature.lot.required_box.is_none() {
                    creature.lot.set_random_search_target(graph, candidate, rng);
                }
            }
        }
        Mood::Stalk => {
            let keep_current = creature
                .lot
                .required_box
                .is_some_and(|b| heuristics.is_stalkable(graph, creature_pos, enemy, b));
            let candidate = if keep_current {
                None
            } else {
                pick_valid_box(ctx, creature, info.zone, rng)
            };
            if let Some(candidate) = candidate {
                if heuristics.is_stalkable(graph, creature_pos, enemy, candidate) {
                    creature.lot.set_random_search_target(graph, candidate, rng);
                } else if creature.lot.required_box.is_none() {
                    creature.lot.set_random_search_target(graph, candidate, rng);
                    if !zones_match {
                        creature.mood = Mood::Bored;
                    }
                }
            }
        }
        Mood::Escape => {
            let candidate = pick_valid_box(ctx, creature, info.zone, rng)
                .filter(|_| creature.lot.required_box.is_none());
            if let Some(candidate) = candidate {
                if heuristics.is_escapable(graph, creature_pos, enemy, candidate) {
                    creature.lot.set_random_search_target(graph, candidate, rng);
                } else if zones_match
                    && heuristics.is_stalkable(graph, creature_pos, enemy, candidate)
                {
                    creature.lot.set_random_search_target(graph, candidate, rng);
                    creature.mood = Mood::Stalk;
                }
            }
        }
    }

    if creature.lot.target_box.is_none() {
        creature.lot.set_random_search_target(graph, creature_box, rng);
    }
    creature
        .lot
        .update_path(graph, ctx.flip, ctx.tuning.max_expansion);
    let steering = creature
        .lot
        .calculate_target(graph, Some(creature_box), creature.pos, rng);
    creature.target = steering.pos;
    steering
}
