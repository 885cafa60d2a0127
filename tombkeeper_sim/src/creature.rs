// Per-creature AI state and the small steering helpers.
//
// `CreatureInfo` is everything the AI core keeps for one creature: pose,
// room and box, health, the hit-this-tick flag, mood, the creature's
// `LotInfo`, the resolved steering target, and head/neck yaw. Only the
// "head-level" part (species, position, yaw, room, health) is persisted;
// the rest is `#[serde(skip)]` and rebuilt by `reset_ai()` after load.
//
// `AiContext` bundles the read-only level inputs every stage of the
// pipeline needs (box graph, sector lookup, flip state, AI tuning) so the
// stage signatures stay short.
//
// Steering helpers:
// - `turn_toward_target()` yaws toward `target`, clamped to `max_turn`, and
//   halves the limit when the target is behind and inside the turning
//   circle (so the creature doesn't orbit it).
// - `apply_tilt()` eases roll toward four times the turn.
// - `track_head()` eases head yaw toward a bearing; the neck follows half way.
// - `switch_locomotion()` swaps the movement profile atomically (e.g. a
//   crocodile leaving the water) and resets the search.
//
// See also: `lot.rs` for the search the creature owns, `mood.rs` and
// `movement.rs` for the pipeline stages that mutate it, `sim.rs` for the
// tick driver.

use crate::config::AiTuning;
use crate::lot::{LotInfo, SteeringTarget, TargetKind};
use crate::mood::Mood;
use crate::nav::BoxGraph;
use crate::sector::SectorQuery;
use crate::species::{MovementProfile, SpeciesData};
use crate::types::{Angle, BoxId, CreatureId, FlipState, RoomId, SpeciesId, WorldPos};
use serde::{Deserialize, Serialize};

/// Read-only level inputs shared by every pipeline stage.
#[derive(Clone, Copy)]
pub struct AiContext<'a> {
    pub graph: &'a BoxGraph,
    pub sectors: &'a dyn SectorQuery,
    pub flip: FlipState,
    pub tuning: &'a AiTuning,
}

/// AI state for one creature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatureInfo {
    pub id: CreatureId,
    pub species_id: SpeciesId,
    pub pos: WorldPos,
    pub yaw: Angle,
    pub room: RoomId,
    pub health: i32,

    #[serde(skip)]
    pub pitch: Angle,
    #[serde(skip)]
    pub roll: Angle,
    /// Box under the creature; `None` while outside the graph.
    #[serde(skip)]
    pub box_id: Option<BoxId>,
    /// Set by the level when the creature takes damage; cleared each tick.
    #[serde(skip)]
    pub hit_this_tick: bool,
    #[serde(skip)]
    pub mood: Mood,
    #[serde(skip)]
    pub lot: LotInfo,
    /// This tick's steering point.
    #[serde(skip)]
    pub target: WorldPos,
    #[serde(skip)]
    pub head_yaw: Angle,
    #[serde(skip)]
    pub neck_yaw: Angle,
}

impl CreatureInfo {
    pub fn new(
        id: CreatureId,
        species_id: SpeciesId,
        species: &SpeciesData,
        ctx: &AiContext<'_>,
        pos: WorldPos,
        yaw: Angle,
    ) -> Self {
        let mut creature = Self {
            id,
            species_id,
            pos,
            yaw,
            room: RoomId::default(),
            health: species.hit_points,
            pitch: Angle::ZERO,
            roll: Angle::ZERO,
            box_id: None,
            hit_this_tick: false,
            mood: Mood::default(),
            lot: LotInfo::default(),
            target: pos,
            head_yaw: Angle::ZERO,
            neck_yaw: Angle::ZERO,
        };
        creature.reset_ai(species, ctx);
        creature
    }

    /// Rebuild everything that isn't persisted: box and room from the sector
    /// lookup, a fresh search sized to the graph, mood and pose extras.
    pub fn reset_ai(&mut self, species: &SpeciesData, ctx: &AiContext<'_>) {
        let sector = ctx
            .sectors
            .sector_at(self.pos.x, self.pos.y, self.pos.z, self.room);
        self.room = sector.room;
        self.box_id = sector.box_id;
        self.lot = LotInfo::new(ctx.graph, &species.movement, ctx.tuning.fly_clearance);
        self.lot.target = self.pos;
        self.lot.rebuild_zone(ctx.graph, self.box_id, ctx.flip);
        self.mood = Mood::Bored;
        self.target = self.pos;
        self.pitch = Angle::ZERO;
        self.roll = Angle::ZERO;
        self.head_yaw = Angle::ZERO;
        self.neck_yaw = Angle::ZERO;
        self.hit_this_tick = false;
    }

    /// The stored steering point, as the target clamp would report it when
    /// there is no box to walk from.
    pub fn last_steering(&self) -> SteeringTarget {
        SteeringTarget {
            pos: self.target,
            kind: TargetKind::Unresolved,
        }
    }

    /// Yaw toward `target` by at most `max_turn`. Returns the yaw change.
    pub fn turn_toward_target(&mut self, speed: i32, max_turn: Angle) -> Angle {
        let limit = max_turn.units().abs();
        if limit == 0 {
            return Angle::ZERO;
        }
        let dx = self.target.x - self.pos.x;
        let dz = self.target.z - self.pos.z;
        let angle = Angle::atan2(dx, dz) - self.yaw;

        // Turning circle radius for this speed and turn rate.
        let range = (i64::from(speed) << 14) / i64::from(limit);
        let behind = angle.units().abs() > Angle::DEG_90.units();
        let dist_sq = i64::from(dx) * i64::from(dx) + i64::from(dz) * i64::from(dz);
        let limit = if behind && dist_sq < range * range {
            limit / 2
        } else {
            limit
        };

        let turn = Angle::from_units(angle.units().clamp(-limit, limit));
        self.yaw += turn;
        turn
    }

    /// Ease roll toward four times `turn`, at most `max_rate` per tick.
    pub fn apply_tilt(&mut self, turn: Angle, max_rate: Angle) {
        let rate = max_rate.units().abs();
        let change = (turn.units() * 4 - self.roll.units()).clamp(-rate, rate);
        self.roll = Angle::from_units(self.roll.units() + change);
    }

    /// Ease the head toward `required` (relative to the body); the neck
    /// follows half way.
    pub fn track_head(&mut self, required: Angle, tuning: &AiTuning) {
        let change = (required - self.head_yaw).clamp_magnitude(tuning.head_turn_rate);
        self.head_yaw = (self.head_yaw + change).clamp_magnitude(tuning.max_head_yaw);
        let lag = (self.head_yaw - self.neck_yaw).units() / 2;
        self.neck_yaw = Angle::from_units(self.neck_yaw.units() + lag);
    }

    /// Swap locomotion limits in one step and restart the search under the
    /// new zone table.
    pub fn switch_locomotion(
        &mut self,
        graph: &BoxGraph,
        flip: FlipState,
        profile: &MovementProfile,
    ) {
        self.lot.set_movement(profile);
        self.lot.reset(graph.box_count());
        self.lot.rebuild_zone(graph, self.box_id, flip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, WOLF};
    use crate::nav::{BoxGraphBuilder, BoxRect};
    use crate::sector::SectorGrid;
    use crate::types::{LocomotionClass, SECTOR_SIZE};

    fn level() -> (BoxGraph, SectorGrid) {
        let mut builder = BoxGraphBuilder::new();
        let a = builder.add_box(BoxRect::sectors(0, 4, 0, 4), 0);
        let b = builder.add_box(BoxRect::sectors(4, 8, 0, 4), 512);
        builder.connect(a, b);
        let graph = builder.build();
        let sectors = SectorGrid::from_graph(&graph, 4096, RoomId(2));
        (graph, sectors)
    }

    fn wolf(graph: &BoxGraph, sectors: &SectorGrid, config: &GameConfig) -> CreatureInfo {
        let ctx = AiContext {
            graph,
            sectors,
            flip: FlipState::Base,
            tuning: &config.ai,
        };
        let species = config.species(WOLF).unwrap();
        CreatureInfo::new(CreatureId(1), WOLF, species, &ctx, WorldPos::new(1000, 0, 1000), Angle::ZERO)
    }

    #[test]
    fn new_creature_locates_itself() {
        let (graph, sectors) = level();
        let config = GameConfig::default();
        let c = wolf(&graph, &sectors, &config);
        assert_eq!(c.box_id, Some(BoxId(0)));
        assert_eq!(c.room, RoomId(2));
        assert_eq!(c.health, config.species(WOLF).unwrap().hit_points);
        assert_eq!(c.mood, Mood::Bored);
        // Quarter-step wolves can't climb to box 1.
        assert_eq!(c.lot.zone_boxes(), &[BoxId(0)]);
    }

    #[test]
    fn turn_is_clamped_to_max_turn() {
        let (graph, sectors) = level();
        let config = GameConfig::default();
        let mut c = wolf(&graph, &sectors, &config);
        c.target = WorldPos::new(1000 + 5 * SECTOR_SIZE, 0, 1000);
        let limit = Angle::from_degrees(5);
        let turn = c.turn_toward_target(48, limit);
        assert_eq!(turn, limit);
        assert_eq!(c.yaw, limit);
    }

    #[test]
    fn turn_is_halved_for_close_targets_behind() {
        let (graph, sectors) = level();
        let config = GameConfig::default();
        let mut c = wolf(&graph, &sectors, &config);
        c.target = WorldPos::new(1000, 0, 900);
        let limit = Angle::from_degrees(5);
        let turn = c.turn_toward_target(48, limit);
        assert_eq!(turn.units().abs(), limit.units() / 2);
    }

    #[test]
    fn tilt_rate_is_capped() {
        let (graph, sectors) = level();
        let config = GameConfig::default();
        let mut c = wolf(&graph, &sectors, &config);
        let rate = config.ai.max_tilt_rate;
        c.apply_tilt(Angle::from_degrees(5), rate);
        assert_eq!(c.roll, rate);
        // Small turns settle on four times the turn.
        let mut c = wolf(&graph, &sectors, &config);
        c.apply_tilt(Angle(100), rate);
        assert_eq!(c.roll, Angle(400));
    }

    #[test]
    fn head_tracking_is_rate_limited_and_clamped() {
        let (graph, sectors) = level();
        let config = GameConfig::default();
        let mut c = wolf(&graph, &sectors, &config);
        c.track_head(Angle::DEG_135, &config.ai);
        assert_eq!(c.head_yaw, config.ai.head_turn_rate);
        assert_eq!(c.neck_yaw.units(), config.ai.head_turn_rate.units() / 2);
        for _ in 0..100 {
            c.track_head(Angle::DEG_135, &config.ai);
        }
        assert_eq!(c.head_yaw, config.ai.max_head_yaw);
    }

    #[test]
    fn switch_locomotion_resets_search() {
        let (graph, sectors) = level();
        let config = GameConfig::default();
        let mut c = wolf(&graph, &sectors, &config);
        c.lot.target_box = Some(BoxId(0));
        c.lot.required_box = Some(BoxId(0));
        c.switch_locomotion(&graph, FlipState::Base, &MovementProfile::climber());
        assert_eq!(c.lot.class, LocomotionClass::HalfStep);
        assert_eq!(c.lot.target_box, None);
        assert_eq!(c.lot.required_box, None);
        assert_eq!(c.lot.generation(), 0);
        // Half-step zone joins box 1.
        assert_eq!(c.lot.zone_boxes(), &[BoxId(0), BoxId(1)]);
    }
}
