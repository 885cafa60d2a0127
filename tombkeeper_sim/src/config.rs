// Data-driven game configuration.
//
// All tunable AI parameters live here in `GameConfig`, loaded from JSON at
// startup. The AI core never uses magic numbers for tuning: chances,
// distances, clearances, and per-tick rates come from `AiTuning`, and
// per-kind behavior from the species table.
//
// Species-specific data (health, turning, locomotion limits) lives in
// `SpeciesData` entries keyed by `SpeciesId` in the `species` map; see
// `species.rs`. A lookup for a missing species is a configuration error and
// is never silently defaulted.
//
// See also: `sim.rs` which owns the `GameConfig` as part of `SimState`,
// `mood.rs` and `movement.rs` which read `AiTuning`.
//
// **Critical constraint: determinism.** Config values feed directly into
// simulation logic; two runs with the same config and seed are identical.

use crate::error::AiError;
use crate::species::{MovementProfile, SpeciesData};
use crate::types::{Angle, SECTOR_SIZE, SpeciesId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known species ids used by the default table.
pub const WOLF: SpeciesId = SpeciesId(1);
pub const BAT: SpeciesId = SpeciesId(2);
pub const APE: SpeciesId = SpeciesId(3);
pub const RAPTOR: SpeciesId = SpeciesId(4);

/// AI tuning shared by every species.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiTuning {
    /// Box expansions each creature's path search may do per tick.
    pub max_expansion: u16,

    /// Chance out of 32768 that a hit, non-violent creature flees even when
    /// it could reach the enemy.
    pub escape_chance: i32,

    /// Chance out of 32768 per tick that a fleeing, non-violent creature
    /// calms down into stalking.
    pub recover_chance: i32,

    /// Planar distance under which a non-violent creature attacks.
    pub attack_range: i32,

    /// How close to the enemy a box must be to serve as a stalking spot.
    pub stalk_distance: i32,

    /// How far from the enemy a box must be to serve as an escape spot.
    pub escape_distance: i32,

    /// Height above the box floor that flying creatures aim for.
    pub fly_clearance: i32,

    /// Distance a ground creature settles toward its floor per tick.
    pub fall_speed: i32,

    /// Largest roll change per tick.
    pub max_tilt_rate: Angle,

    /// Largest head yaw change per tick.
    pub head_turn_rate: Angle,

    /// Head yaw limit either side of the body.
    pub max_head_yaw: Angle,

    /// Pitch easing per tick for flyers.
    pub pitch_rate: Angle,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            max_expansion: 5,
            escape_chance: 2048,
            recover_chance: 256,
            attack_range: 3 * SECTOR_SIZE,
            stalk_distance: 3 * SECTOR_SIZE,
            escape_distance: 5 * SECTOR_SIZE,
            fly_clearance: 384,
            fall_speed: 64,
            max_tilt_rate: Angle::from_degrees(3),
            head_turn_rate: Angle::from_degrees(5),
            max_head_yaw: Angle::DEG_90,
            pitch_rate: Angle::DEG_1,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Seed for the sim's PRNG when none is given explicitly.
    pub default_seed: u64,

    pub ai: AiTuning,

    /// Per-species data, keyed by `SpeciesId`.
    pub species: BTreeMap<SpeciesId, SpeciesData>,
}

impl GameConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, AiError> {
        serde_json::from_str(json).map_err(AiError::Config)
    }

    /// Look up a species. Missing entries are an error, not a default.
    pub fn species(&self, id: SpeciesId) -> Result<&SpeciesData, AiError> {
        self.species.get(&id).ok_or(AiError::MissingSpecies(id))
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        let mut species = BTreeMap::new();
        species.insert(
            WOLF,
            SpeciesData {
                name: "wolf".into(),
                hit_points: 6,
                pivot_length: 375,
                radius: 341,
                target_update_chance: 0x2000,
                violent: false,
                movement: MovementProfile::walker(),
                max_turn: Angle::from_degrees(5),
                speed: 48,
                body_height: 400,
            },
        );
        species.insert(
            BAT,
            SpeciesData {
                name: "bat".into(),
                hit_points: 1,
                pivot_length: 0,
                radius: 102,
                target_update_chance: 0x400,
                violent: true,
                movement: MovementProfile::flyer(16),
                max_turn: Angle::from_degrees(20),
                speed: 40,
                body_height: 128,
            },
        );
        species.insert(
            APE,
            SpeciesData {
                name: "ape".into(),
                hit_points: 22,
                pivot_length: 250,
                radius: 341,
                target_update_chance: 0x7FFF,
                violent: false,
                movement: MovementProfile::climber(),
                max_turn: Angle::from_degrees(5),
                speed: 36,
                body_height: 700,
            },
        );
        species.insert(
            RAPTOR,
            SpeciesData {
                name: "raptor".into(),
                hit_points: 20,
                pivot_length: 400,
                radius: 341,
                target_update_chance: 0x4000,
                violent: true,
                movement: MovementProfile::walker(),
                max_turn: Angle::from_degrees(4),
                speed: 64,
                body_height: 900,
            },
        );

        Self {
            default_seed: 0x7043_6b65_6570,
            ai: AiTuning::default(),
            species,
        }
    }
}
