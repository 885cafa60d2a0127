// Core types shared across the simulation.
//
// Defines world-space positions (`WorldPos`), 16-bit binary angles (`Angle`),
// the compact index types that address the box arena (`BoxId`, `ZoneId`,
// `RoomId`), creature/species identifiers, and the level-scale constants
// every module measures against.
//
// Units: one sector is 1024 world units; a "step" is a quarter sector. The Y
// axis points up, so a larger floor value is a higher floor. Yaw 0 faces +Z
// and yaw +90° faces +X.
//
// **Critical constraint: determinism.** Angle conversions go through `f64`
// trigonometry rounded to integers; all stored state is integral.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// ---------------------------------------------------------------------------
// Level scale
// ---------------------------------------------------------------------------

/// Side length of one sector in world units.
pub const SECTOR_SIZE: i32 = 1024;

/// Half a sector; the inset used when choosing points inside a box.
pub const HALF_SECTOR: i32 = SECTOR_SIZE / 2;

/// A quarter sector: the smallest climbable step.
pub const STEP_SIZE: i32 = SECTOR_SIZE / 4;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance on the XZ plane. Widened to `i64` so level-sized
    /// offsets cannot overflow.
    pub fn planar_distance_sq(self, other: Self) -> i64 {
        let dx = i64::from(other.x - self.x);
        let dz = i64::from(other.z - self.z);
        dx * dx + dz * dz
    }

    /// This position moved `distance` units along `yaw` on the XZ plane.
    pub fn offset_along(self, yaw: Angle, distance: i32) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self {
            x: self.x + (sin * f64::from(distance)).round() as i32,
            y: self.y,
            z: self.z + (cos * f64::from(distance)).round() as i32,
        }
    }
}

impl fmt::Display for WorldPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Angles
// ---------------------------------------------------------------------------

/// A 16-bit binary angle: the full circle is 65536 units and arithmetic
/// wraps, so `Angle::DEG_180 + Angle::DEG_180 == Angle::ZERO`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Angle(pub i16);

impl Angle {
    pub const ZERO: Angle = Angle(0);
    pub const DEG_1: Angle = Angle(182);
    pub const DEG_45: Angle = Angle(0x2000);
    pub const DEG_90: Angle = Angle(0x4000);
    pub const DEG_135: Angle = Angle(0x6000);
    /// Half turn; stored as `i16::MIN`, which wraps to itself under negation.
    pub const DEG_180: Angle = Angle(i16::MIN);

    /// Build from whole degrees (wrapping).
    pub fn from_degrees(degrees: i32) -> Self {
        Angle::from_units(degrees * 65536 / 360)
    }

    /// Wrap an arbitrary integer into the 16-bit circle.
    pub fn from_units(units: i32) -> Self {
        Angle(units as u16 as i16)
    }

    /// Heading of the vector `(dx, dz)`: 0 along +Z, +90° along +X.
    pub fn atan2(dx: i32, dz: i32) -> Self {
        if dx == 0 && dz == 0 {
            return Angle::ZERO;
        }
        let radians = f64::from(dx).atan2(f64::from(dz));
        Angle::from_units((radians * 32768.0 / std::f64::consts::PI).round() as i32)
    }

    /// `(sin, cos)` of this angle.
    pub fn sin_cos(self) -> (f64, f64) {
        let radians = f64::from(self.0) * std::f64::consts::PI / 32768.0;
        radians.sin_cos()
    }

    /// Signed magnitude as an `i32`, for comparisons against limits.
    pub fn units(self) -> i32 {
        i32::from(self.0)
    }

    /// Clamp to `[-limit, limit]` (limit taken as a magnitude).
    pub fn clamp_magnitude(self, limit: Angle) -> Self {
        let limit = limit.units().abs();
        Angle::from_units(self.units().clamp(-limit, limit))
    }

    /// Quadrant index 0..=3 (yaw >> 14, shifted to be non-negative).
    pub fn quadrant(self) -> i32 {
        (self.units() >> 14) + 2
    }
}

impl Add for Angle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Angle) {
        *self = *self + rhs;
    }
}

impl Sub for Angle {
    type Output = Angle;
    fn sub(self, rhs: Angle) -> Angle {
        Angle(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Angle) {
        *self = *self - rhs;
    }
}

impl Neg for Angle {
    type Output = Angle;
    fn neg(self) -> Angle {
        Angle(self.0.wrapping_neg())
    }
}

// ---------------------------------------------------------------------------
// Arena indices: compact integers, not UUIDs.
// ---------------------------------------------------------------------------

/// Index of a box in the level's box arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoxId(pub u16);

impl BoxId {
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box#{}", self.0)
    }
}

/// A zone: an equivalence class of mutually reachable boxes for one
/// locomotion class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u16);

/// A room of the level. Sectors belong to exactly one room.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u16);

/// Key into the species table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub u16);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "species#{}", self.0)
    }
}

/// Identifier for a creature instance, assigned sequentially by the sim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatureId(pub u32);

impl fmt::Display for CreatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "creature#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Level-wide enums
// ---------------------------------------------------------------------------

/// Which room set (and zone tables) the level currently uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlipState {
    #[default]
    Base,
    Alternate,
}

/// Locomotion classes that get their own zone table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocomotionClass {
    /// Ground creatures that climb at most a quarter sector.
    #[default]
    QuarterStep,
    /// Ground creatures that climb at most half a sector.
    HalfStep,
    /// Flying and swimming creatures.
    Fly,
}
