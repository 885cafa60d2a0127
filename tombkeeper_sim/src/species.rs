// Species data: data-driven creature configuration.
//
// Every behavioral difference between creature kinds (wolves, bats,
// crocodiles, apes) is expressed as data in `SpeciesData`, keyed by
// `SpeciesId` in the game config. The AI core uses one `CreatureInfo` type
// and reads species values from the table at runtime; there is no code
// branching per species.
//
// `MovementProfile` bundles the locomotion limits the box search and
// movement reconciliation enforce: how far up a creature may step, how far
// down it may drop (negative), how fast it flies (0 = ground-bound), and
// which `BoxFlags` it refuses to enter. Its preset constructors cover the
// usual classes.
//
// See also: `config.rs` where the species table lives, `creature.rs` for
// `switch_locomotion` (the one place a profile changes after spawn),
// `lot.rs` for `MovementLimits`, which the search reads.
//
// **Critical constraint: determinism.** Species data is part of the game
// config and feeds straight into path search and movement.

use crate::nav::BoxFlags;
use crate::types::{Angle, LocomotionClass, SECTOR_SIZE, STEP_SIZE};
use serde::{Deserialize, Serialize};

/// Locomotion limits for one creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementProfile {
    /// Largest climb between adjacent boxes (positive).
    pub step: i32,
    /// Largest descent between adjacent boxes (negative).
    pub drop: i32,
    /// Vertical speed per tick. Zero for ground creatures.
    pub fly: i32,
    /// Boxes with any of these flags are impassable.
    pub block_mask: BoxFlags,
}

impl MovementProfile {
    /// Climbs a single step, drops two.
    pub fn walker() -> Self {
        Self {
            step: STEP_SIZE,
            drop: -2 * STEP_SIZE,
            fly: 0,
            block_mask: BoxFlags::BLOCKED,
        }
    }

    /// Climbs half a sector, drops a whole one. Big enough that it won't
    /// squeeze through blockable gaps.
    pub fn climber() -> Self {
        Self {
            step: 2 * STEP_SIZE,
            drop: -SECTOR_SIZE,
            fly: 0,
            block_mask: BoxFlags::BLOCKABLE,
        }
    }

    /// Flies or swims at `speed` units per tick; any box height is fine.
    pub fn flyer(speed: i32) -> Self {
        Self {
            step: 20 * SECTOR_SIZE,
            drop: -20 * SECTOR_SIZE,
            fly: speed,
            block_mask: BoxFlags::BLOCKED,
        }
    }

    pub fn is_flying(&self) -> bool {
        self.fly != 0
    }

    /// Which zone table this profile navigates by.
    pub fn class(&self) -> LocomotionClass {
        if self.is_flying() {
            LocomotionClass::Fly
        } else if self.step > STEP_SIZE {
            LocomotionClass::HalfStep
        } else {
            LocomotionClass::QuarterStep
        }
    }
}

/// Data-driven parameters for a creature species.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeciesData {
    /// Display name, for logs and tools.
    pub name: String,

    /// Starting health.
    pub hit_points: i32,

    /// How far ahead of the enemy (along the enemy's facing) the creature
    /// measures distance and angle to.
    pub pivot_length: i32,

    /// Collision radius used by corner probes and soft collision.
    pub radius: i32,

    /// Chance out of 32768, per tick, that an attacking creature re-aims at
    /// the enemy's current position.
    pub target_update_chance: i32,

    /// Violent creatures attack whenever they can reach the enemy; others
    /// stalk first and flee when hurt.
    pub violent: bool,

    pub movement: MovementProfile,

    /// Largest yaw change per tick.
    pub max_turn: Angle,

    /// Forward distance per tick.
    pub speed: i32,

    /// Height from feet to top of body, for ceiling checks.
    pub body_height: i32,
}
