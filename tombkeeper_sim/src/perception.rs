// Per-tick perception snapshot (`AiInfo`).
//
// Before the mood FSM runs, each creature takes one look at its enemy and
// condenses it into an `AiInfo`: which zone the creature stands in, whether
// the enemy's zone is reachable, and the distance and bearing to a pivot
// point placed `pivot_length` ahead of the enemy along the enemy's facing.
// The snapshot is ephemeral and never stored.
//
// Reachability is typed (`EnemyZone`) rather than folded into the zone
// number: an enemy standing in a box this creature refuses to enter, or a
// creature whose own box was reached only through a blocked box in the
// current search, yields `Unreachable`, and an enemy outside every box
// yields `Nowhere`.
//
// See also: `mood.rs` which consumes the snapshot, `lot.rs` for the
// tombstone test.

use crate::creature::CreatureInfo;
use crate::nav::BoxGraph;
use crate::species::SpeciesData;
use crate::types::{Angle, BoxId, FlipState, STEP_SIZE, WorldPos, ZoneId};
use serde::{Deserialize, Serialize};

/// The creature's current enemy, as the AI sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub box_id: Option<BoxId>,
    pub pos: WorldPos,
    pub yaw: Angle,
    pub health: i32,
    /// Height above the enemy's feet that flyers aim at.
    pub aim_height: i32,
}

/// Where the enemy stands relative to the creature's zone table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyZone {
    Reachable(ZoneId),
    Unreachable(ZoneId),
    /// The enemy is outside every box.
    Nowhere,
}

/// Snapshot of what a creature perceives this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiInfo {
    pub zone: ZoneId,
    pub enemy_zone: EnemyZone,
    /// Squared planar distance to the pivot.
    pub distance: i64,
    /// Yaw offset from the creature's facing to the pivot.
    pub angle: Angle,
    /// How directly the enemy faces the creature (0 = head on).
    pub enemy_facing: Angle,
    /// The pivot is in front of the creature.
    pub ahead: bool,
    /// Ahead and within a step vertically.
    pub bite: bool,
}

impl AiInfo {
    /// Take the snapshot. `None` if the creature is outside every box.
    pub fn compute(
        graph: &BoxGraph,
        flip: FlipState,
        creature: &CreatureInfo,
        species: &SpeciesData,
        enemy: &Enemy,
    ) -> Option<Self> {
        let creature_box = creature.box_id?;
        let lot = &creature.lot;
        let zone = graph.zone(creature_box, lot.class, flip);

        let enemy_zone = match enemy.box_id {
            None => EnemyZone::Nowhere,
            Some(b) => {
                let z = graph.zone(b, lot.class, flip);
                if graph.nav_box(b).flags.intersects(lot.block_mask)
                    || lot.is_tombstoned_now(creature_box)
                {
                    EnemyZone::Unreachable(z)
                } else {
                    EnemyZone::Reachable(z)
                }
            }
        };

        let pivot = enemy.pos.offset_along(enemy.yaw, species.pivot_length);
        let dx = pivot.x - creature.pos.x;
        let dz = pivot.z - creature.pos.z;
        let bearing = Angle::atan2(dx, dz);
        let angle = bearing - creature.yaw;
        let ahead = angle.units().abs() < Angle::DEG_90.units();

        Some(Self {
            zone,
            enemy_zone,
            distance: creature.pos.planar_distance_sq(pivot),
            angle,
            enemy_facing: bearing - enemy.yaw + Angle::DEG_180,
            ahead,
            bite: ahead && (enemy.pos.y - creature.pos.y).abs() < STEP_SIZE,
        })
    }

    /// Reachable and in the creature's own zone.
    pub fn zones_match(&self) -> bool {
        self.enemy_zone == EnemyZone::Reachable(self.zone)
    }
}
