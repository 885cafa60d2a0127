// Movement reconciliation: turning desired motion into a legal position.
//
// `animate_creature()` advances a creature along its yaw by the intended
// speed (a stand-in for animation root motion) and then pulls the result
// back into traversable space:
//
//   1. **Whole-sector legality.** If the new sector has no box, lies in
//      another zone, is blocked for this creature, or is a rise outside the
//      step/drop window, each axis that crossed a sector boundary is pinned
//      to the old sector's edge.
//   2. **Corner probes.** Within the sector, points one collision radius out
//      toward nearby edges are tested with `is_position_out_of_reach()`.
//      Each failing axis probe pushes the creature out along that axis. If
//      only the diagonal probe fails, the creature's yaw decides which axis
//      gives way. A push adds the intended turn again and doubles the tilt.
//   3. **Soft collision.** Moving closer than one radius to another active
//      entity rolls the whole horizontal move back.
//   4. **Vertical.** Flyers close on the target height at up to `fly` per
//      tick; if that would tunnel through the floor or ceiling the move is
//      corrected (and, when already through, rolled back with the vertical
//      speed forced back toward open space). Pitch eases toward the climb
//      angle. Ground creatures snap to the floor when below or near it and
//      otherwise settle by `fall_speed` per tick.
//   5. Room and box come from the final sector.
//
// See also: `sector.rs` for `SectorQuery`, `lot.rs` for the limits and exit
// chain the probes consult, `creature.rs` for `apply_tilt()`.
//
// **Critical constraint: determinism.** Pure integer arithmetic apart from
// the rounded trigonometry in `WorldPos::offset_along`.

use crate::creature::{AiContext, CreatureInfo};
use crate::lot::LotInfo;
use crate::species::SpeciesData;
use crate::types::{Angle, BoxId, RoomId, SECTOR_SIZE, WorldPos};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

/// What the creature wants to do this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    /// Forward distance along yaw.
    pub speed: i32,
    /// Extra yaw applied when a corner probe pushes the creature.
    pub turn: Angle,
    /// Roll input for `CreatureInfo::apply_tilt`.
    pub tilt: Angle,
}

/// What actually happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub pos: WorldPos,
    pub room: RoomId,
    pub box_id: Option<BoxId>,
    /// Pinned back at a sector edge.
    pub sector_rollback: bool,
    /// Pushed out by a corner probe.
    pub shifted: bool,
    /// Gave way to another entity.
    pub yielded: bool,
}

/// A point to test for reachability, with the heights it's judged against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReachProbe {
    pub x: i32,
    pub z: i32,
    /// Top of the creature's body.
    pub y_top: i32,
    /// The creature's feet.
    pub feet_y: i32,
    /// Floor of the box the creature is in.
    pub box_floor: i32,
    /// Floor of the next box along the exit chain (or `box_floor`).
    pub next_floor: i32,
    pub room: RoomId,
}

/// Whether the creature must not stand at the probe point.
pub fn is_position_out_of_reach(ctx: &AiContext<'_>, lot: &LotInfo, probe: &ReachProbe) -> bool {
    let sector = ctx
        .sectors
        .sector_at(probe.x, probe.y_top, probe.z, probe.room);
    let Some(b) = sector.box_id else {
        return true;
    };
    let nav = ctx.graph.nav_box(b);
    if nav.flags.intersects(lot.block_mask) {
        return true;
    }

    let limits = lot.limits;
    let rise = nav.floor - probe.box_floor;
    if !limits.allows_rise(rise) {
        return true;
    }
    // A big drop is only fine if the path goes down there anyway.
    if rise < -limits.step && nav.floor < probe.next_floor {
        return true;
    }
    if limits.is_flying()
        && (probe.y_top < nav.floor - limits.fly || probe.feet_y > sector.ceiling + limits.fly)
    {
        return true;
    }
    false
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ProbeAxis {
    X,
    Z,
    Diagonal,
}

#[derive(Clone, Copy, Debug)]
struct CornerProbe {
    dx: i32,
    dz: i32,
    axis: ProbeAxis,
}

/// Which side of the sector a coordinate is close to: -1 low, 1 high, 0 neither.
fn edge_side(offset: i32, radius: i32) -> i32 {
    if offset < radius {
        -1
    } else if offset > SECTOR_SIZE - radius {
        1
    } else {
        0
    }
}

/// Pin `new` back inside the sector containing `old`, on whichever edge it
/// crossed.
fn pin_to_sector(old: i32, new: i32) -> i32 {
    let old_sector = old.div_euclid(SECTOR_SIZE);
    let new_sector = new.div_euclid(SECTOR_SIZE);
    if new_sector < old_sector {
        old_sector * SECTOR_SIZE
    } else if new_sector > old_sector {
        old_sector * SECTOR_SIZE + SECTOR_SIZE - 1
    } else {
        new
    }
}

/// When only the diagonal probe fails, whether the Z axis gives way.
fn diagonal_shifts_z(side_x: i32, side_z: i32, yaw: Angle) -> bool {
    let yaw = yaw.units();
    let toward_low_x = yaw > -Angle::DEG_135.units() && yaw < Angle::DEG_45.units();
    let toward_high_x = yaw > -Angle::DEG_45.units() && yaw < Angle::DEG_135.units();
    match (side_z < 0, side_x < 0) {
        (true, true) => toward_low_x,
        (true, false) => toward_high_x,
        (false, true) => !toward_high_x,
        (false, false) => !toward_low_x,
    }
}

/// Advance `creature` by `intent` and reconcile the result with the level.
///
/// `others` are the positions of other active entities to keep clear of.
pub fn animate_creature(
    ctx: &AiContext<'_>,
    creature: &mut CreatureInfo,
    species: &SpeciesData,
    intent: MoveIntent,
    others: &[WorldPos],
) -> MoveOutcome {
    let old = creature.pos;
    let Some(current_box) = creature.box_id else {
        trace!(creature = %creature.id, "movement_skipped: no box");
        return MoveOutcome {
            pos: old,
            room: creature.room,
            box_id: None,
            sector_rollback: false,
            shifted: false,
            yielded: false,
        };
    };
    let graph = ctx.graph;
    let limits = creature.lot.limits;
    let class = creature.lot.class;
    let box_floor = graph.nav_box(current_box).floor;
    let next_floor = creature
        .lot
        .exit_box(current_box)
        .map_or(box_floor, |b| graph.nav_box(b).floor);
    let zone = graph.zone(current_box, class, ctx.flip);

    let mut pos = old.offset_along(creature.yaw, intent.speed);

    // Whole-sector legality.
    let sector = ctx.sectors.sector_at(pos.x, pos.y, pos.z, creature.room);
    let legal = sector.box_id.is_some_and(|b| {
        let nav = graph.nav_box(b);
        graph.zone(b, class, ctx.flip) == zone
            && !nav.flags.intersects(creature.lot.block_mask)
            && limits.allows_rise(nav.floor - box_floor)
    });
    let sector_rollback = !legal;
    if sector_rollback {
        pos.x = pin_to_sector(old.x, pos.x);
        pos.z = pin_to_sector(old.z, pos.z);
    }

    // Corner probes.
    let radius = species.radius;
    let offset_x = pos.x.rem_euclid(SECTOR_SIZE);
    let offset_z = pos.z.rem_euclid(SECTOR_SIZE);
    let side_x = edge_side(offset_x, radius);
    let side_z = edge_side(offset_z, radius);
    let push_x = if side_x < 0 {
        radius - offset_x
    } else {
        SECTOR_SIZE - radius - offset_x
    };
    let push_z = if side_z < 0 {
        radius - offset_z
    } else {
        SECTOR_SIZE - radius - offset_z
    };

    let mut probes: SmallVec<[CornerProbe; 3]> = SmallVec::new();
    if side_z != 0 {
        probes.push(CornerProbe {
            dx: 0,
            dz: side_z * radius,
            axis: ProbeAxis::Z,
        });
    }
    if side_x != 0 {
        probes.push(CornerProbe {
            dx: side_x * radius,
            dz: 0,
            axis: ProbeAxis::X,
        });
        if side_z != 0 {
            probes.push(CornerProbe {
                dx: side_x * radius,
                dz: side_z * radius,
                axis: ProbeAxis::Diagonal,
            });
        }
    }

    let base_probe = ReachProbe {
        x: pos.x,
        z: pos.z,
        y_top: pos.y + species.body_height,
        feet_y: pos.y,
        box_floor,
        next_floor,
        room: creature.room,
    };
    let out_of_reach = |p: &CornerProbe| {
        is_position_out_of_reach(
            ctx,
            &creature.lot,
            &ReachProbe {
                x: pos.x + p.dx,
                z: pos.z + p.dz,
                ..base_probe
            },
        )
    };
    let (mut shift_x, mut shift_z) = (0, 0);
    for probe in &probes {
        match probe.axis {
            ProbeAxis::Z => {
                if out_of_reach(probe) {
                    shift_z = push_z;
                }
            }
            ProbeAxis::X => {
                if out_of_reach(probe) {
                    shift_x = push_x;
                }
            }
            ProbeAxis::Diagonal => {
                if shift_x == 0 && shift_z == 0 && out_of_reach(probe) {
                    if diagonal_shifts_z(side_x, side_z, creature.yaw) {
                        shift_z = push_z;
                    } else {
                        shift_x = push_x;
                    }
                }
            }
        }
    }
    pos.x += shift_x;
    pos.z += shift_z;

    let shifted = shift_x != 0 || shift_z != 0;
    let max_tilt = ctx.tuning.max_tilt_rate;
    if shifted {
        creature.yaw += intent.turn;
        creature.apply_tilt(Angle::from_units(intent.tilt.units() * 2), max_tilt);
    } else {
        creature.apply_tilt(intent.tilt, max_tilt);
    }

    // Soft collision: give way rather than push closer to someone.
    let radius_sq = i64::from(radius) * i64::from(radius);
    let crowded = others.iter().any(|other| {
        let after = other.planar_distance_sq(pos);
        after < radius_sq && after < other.planar_distance_sq(old)
    });
    if crowded {
        trace!(creature = %creature.id, "movement_yield");
        return MoveOutcome {
            pos: old,
            room: creature.room,
            box_id: creature.box_id,
            sector_rollback,
            shifted,
            yielded: true,
        };
    }

    // Vertical.
    let sector = ctx.sectors.sector_at(pos.x, pos.y, pos.z, creature.room);
    let (floor, ceiling) = match sector.box_id {
        Some(_) => (sector.floor, sector.ceiling),
        None => (box_floor, i32::MAX),
    };
    if limits.is_flying() {
        let fly = limits.fly;
        let mut dy = (creature.target.y - pos.y).clamp(-fly, fly);
        if pos.y + dy < floor {
            if pos.y < floor {
                pos.x = old.x;
                pos.z = old.z;
                dy = fly;
            } else {
                pos.y = floor;
                dy = 0;
            }
        } else {
            let top = pos.y + species.body_height;
            if top.saturating_add(dy) > ceiling {
                if top > ceiling {
                    pos.x = old.x;
                    pos.z = old.z;
                    dy = -fly;
                } else {
                    dy = 0;
                }
            }
        }
        pos.y += dy;

        let climb = if intent.speed != 0 {
            Angle::atan2(dy, intent.speed)
        } else {
            Angle::ZERO
        };
        let rate = ctx.tuning.pitch_rate.units().abs();
        let diff = (climb - creature.pitch).units();
        creature.pitch = if diff > rate {
            creature.pitch + Angle::from_units(rate)
        } else if diff < -rate {
            creature.pitch - Angle::from_units(rate)
        } else {
            climb
        };
    } else {
        let fall = ctx.tuning.fall_speed;
        if pos.y - floor > fall {
            pos.y -= fall;
        } else {
            pos.y = floor;
        }
    }

    creature.pos = pos;
    let sector = ctx.sectors.sector_at(pos.x, pos.y, pos.z, creature.room);
    creature.room = sector.room;
    creature.box_id = sector.box_id.or(creature.box_id);

    MoveOutcome {
        pos,
        room: creature.room,
        box_id: creature.box_id,
        sector_rollback,
        shifted,
        yielded: false,
    }
}
