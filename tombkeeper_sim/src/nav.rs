// Box navigation graph for creature pathfinding.
//
// A level's walkable space is covered by axis-aligned `NavBox`es. Each box
// has a floor height, block flags, and a run of neighbors ("overlaps") in a
// flat table shared by every box. Zone tables partition the boxes into
// mutually reachable classes per locomotion class and flip state, so the AI
// can reject unreachable targets without searching.
//
// The graph is read-only to the AI core. The one mutation the level makes
// at runtime is toggling `BoxFlags::BLOCKED` (doors, traps) via
// `set_blocked`; creatures observe that through their `block_mask`.
//
// Level data arrives with sentinel-terminated overlap runs (high bit ends a
// run, low 15 bits are the neighbor) and block flags packed into the top
// bits of each box's overlap index. `BoxGraph::from_raw` decodes that once
// into explicit `(start, len)` ranges; nothing downstream sees terminator
// bits. `BoxGraphBuilder` constructs graphs directly (tests, tools) and
// computes zones by flood fill.
//
// All storage uses `Vec` indexed by `BoxId` for O(1) lookup and
// deterministic iteration order. No `HashMap`.
//
// See also: `lot.rs` for the per-creature search over this graph,
// `sector.rs` for the fine grid that maps positions onto boxes.

use crate::error::AiError;
use crate::types::{BoxId, FlipState, LocomotionClass, SECTOR_SIZE, STEP_SIZE, ZoneId};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-box flags, laid out as in the packed overlap index.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct BoxFlags: u16 {
        /// Currently closed off (a shut door, a trap).
        const BLOCKED = 0x4000;
        /// Can be closed off; large creatures avoid these entirely.
        const BLOCKABLE = 0x8000;
    }
}

/// Packed-overlap sentinel: the box has no neighbors.
const RAW_NO_OVERLAPS: u16 = 0x3FFF;
/// Low bits of a packed overlap index.
const RAW_OVERLAP_INDEX: u16 = 0x3FFF;
/// High bit of an overlap word: last entry of the run.
const RAW_END_BIT: u16 = 0x8000;
/// Low bits of an overlap word.
const RAW_BOX_NUMBER: u16 = 0x7FFF;

/// An axis-aligned floor-plan cell.
///
/// Bounds are in world units, min inclusive and max exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavBox {
    pub x_min: i32,
    pub x_max: i32,
    pub z_min: i32,
    pub z_max: i32,
    /// Floor height (Y up).
    pub floor: i32,
    pub flags: BoxFlags,
    overlap_start: u32,
    overlap_len: u16,
}

impl NavBox {
    /// Whether `(x, z)` lies inside the footprint.
    pub fn contains(&self, x: i32, z: i32) -> bool {
        self.contains_x(x) && self.contains_z(z)
    }

    pub fn contains_x(&self, x: i32) -> bool {
        x >= self.x_min && x < self.x_max
    }

    pub fn contains_z(&self, z: i32) -> bool {
        z >= self.z_min && z < self.z_max
    }

    /// Footprint center `(x, z)`.
    pub fn center(&self) -> (i32, i32) {
        ((self.x_min + self.x_max) / 2, (self.z_min + self.z_max) / 2)
    }
}

/// A box footprint, used when building graphs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxRect {
    pub x_min: i32,
    pub x_max: i32,
    pub z_min: i32,
    pub z_max: i32,
}

impl BoxRect {
    /// A rectangle given in whole sectors: `x0..x1` by `z0..z1`.
    pub fn sectors(x0: i32, x1: i32, z0: i32, z1: i32) -> Self {
        Self {
            x_min: x0 * SECTOR_SIZE,
            x_max: x1 * SECTOR_SIZE,
            z_min: z0 * SECTOR_SIZE,
            z_max: z1 * SECTOR_SIZE,
        }
    }
}

/// A box as stored in level data: flags and the overlap-run start share a
/// single packed 16-bit field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBox {
    pub x_min: i32,
    pub x_max: i32,
    pub z_min: i32,
    pub z_max: i32,
    pub floor: i32,
    pub overlap_index: u16,
}

/// Zone tables for one flip state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSet {
    pub quarter_step: Vec<ZoneId>,
    pub half_step: Vec<ZoneId>,
    pub fly: Vec<ZoneId>,
}

impl ZoneSet {
    pub fn table(&self, class: LocomotionClass) -> &[ZoneId] {
        match class {
            LocomotionClass::QuarterStep => &self.quarter_step,
            LocomotionClass::HalfStep => &self.half_step,
            LocomotionClass::Fly => &self.fly,
        }
    }

    fn tables(&self) -> [&[ZoneId]; 3] {
        [&self.quarter_step, &self.half_step, &self.fly]
    }
}

/// Zone tables for both flip states.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTables {
    pub base: ZoneSet,
    pub alternate: ZoneSet,
}

impl ZoneTables {
    pub fn set(&self, flip: FlipState) -> &ZoneSet {
        match flip {
            FlipState::Base => &self.base,
            FlipState::Alternate => &self.alternate,
        }
    }
}

/// The box graph container.
#[derive(Clone, Debug, Default)]
pub struct BoxGraph {
    boxes: Vec<NavBox>,
    overlaps: Vec<BoxId>,
    zones: ZoneTables,
}

impl BoxGraph {
    /// Decode level data: sentinel-terminated overlap runs and packed
    /// overlap indices.
    ///
    /// Fails if an overlap entry or a zone table doesn't match the number of
    /// boxes. A run that reaches the end of the table without a terminator
    /// ends there.
    pub fn from_raw(
        raw_boxes: &[RawBox],
        overlap_words: &[u16],
        zones: ZoneTables,
    ) -> Result<Self, AiError> {
        let count = raw_boxes.len();
        let mut boxes = Vec::with_capacity(count);
        let mut overlaps = Vec::new();

        for raw in raw_boxes {
            let flags = BoxFlags::from_bits_truncate(raw.overlap_index & !RAW_OVERLAP_INDEX);
            let start = raw.overlap_index & RAW_OVERLAP_INDEX;
            let overlap_start = overlaps.len() as u32;

            if start != RAW_NO_OVERLAPS {
                for &word in overlap_words.iter().skip(usize::from(start)) {
                    let index = usize::from(word & RAW_BOX_NUMBER);
                    if index >= count {
                        return Err(AiError::BoxOutOfRange { index, count });
                    }
                    overlaps.push(BoxId(index as u16));
                    if word & RAW_END_BIT != 0 {
                        break;
                    }
                }
            }

            boxes.push(NavBox {
                x_min: raw.x_min,
                x_max: raw.x_max,
                z_min: raw.z_min,
                z_max: raw.z_max,
                floor: raw.floor,
                flags,
                overlap_start,
                overlap_len: (overlaps.len() as u32 - overlap_start) as u16,
            });
        }

        for set in [&zones.base, &zones.alternate] {
            for table in set.tables() {
                if table.len() != count {
                    return Err(AiError::BoxOutOfRange {
                        index: table.len(),
                        count,
                    });
                }
            }
        }

        Ok(Self {
            boxes,
            overlaps,
            zones,
        })
    }

    /// Number of boxes.
    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    /// Get a box by ID.
    pub fn nav_box(&self, id: BoxId) -> &NavBox {
        &self.boxes[id.index()]
    }

    /// All boxes, in ID order.
    pub fn boxes(&self) -> &[NavBox] {
        &self.boxes
    }

    /// The boxes overlapping `id`. Finite and restartable: call again to
    /// iterate again.
    pub fn neighbors(&self, id: BoxId) -> &[BoxId] {
        let b = &self.boxes[id.index()];
        let start = b.overlap_start as usize;
        &self.overlaps[start..start + usize::from(b.overlap_len)]
    }

    /// Zone of `id` for a locomotion class under a flip state.
    pub fn zone(&self, id: BoxId, class: LocomotionClass, flip: FlipState) -> ZoneId {
        self.zones.set(flip).table(class)[id.index()]
    }

    /// Every box in `zone`, in ID order.
    pub fn boxes_in_zone(
        &self,
        zone: ZoneId,
        class: LocomotionClass,
        flip: FlipState,
    ) -> Vec<BoxId> {
        self.zones
            .set(flip)
            .table(class)
            .iter()
            .enumerate()
            .filter(|&(_, &z)| z == zone)
            .map(|(i, _)| BoxId(i as u16))
            .collect()
    }

    /// Open or close a box (doors, traps).
    pub fn set_blocked(&mut self, id: BoxId, blocked: bool) {
        self.boxes[id.index()].flags.set(BoxFlags::BLOCKED, blocked);
    }
}

/// Incremental constructor for `BoxGraph`.
///
/// Boxes get sequential IDs. `connect` records a two-way overlap; zones are
/// flood-filled in `build()` per locomotion class, joining linked boxes whose
/// floors differ by at most one step (quarter-step class), two steps
/// (half-step class), or any amount (fly class).
#[derive(Clone, Debug, Default)]
pub struct BoxGraphBuilder {
    boxes: Vec<NavBox>,
    links: Vec<Vec<BoxId>>,
    /// Links that don't exist while the level is flipped.
    severed_in_alternate: Vec<(BoxId, BoxId)>,
}

impl BoxGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a box. Returns its ID.
    pub fn add_box(&mut self, rect: BoxRect, floor: i32) -> BoxId {
        let id = BoxId(self.boxes.len() as u16);
        self.boxes.push(NavBox {
            x_min: rect.x_min,
            x_max: rect.x_max,
            z_min: rect.z_min,
            z_max: rect.z_max,
            floor,
            flags: BoxFlags::empty(),
            overlap_start: 0,
            overlap_len: 0,
        });
        self.links.push(Vec::new());
        id
    }

    /// Set a box's flags.
    pub fn set_flags(&mut self, id: BoxId, flags: BoxFlags) -> &mut Self {
        self.boxes[id.index()].flags = flags;
        self
    }

    /// Record that `a` and `b` overlap (two-way).
    pub fn connect(&mut self, a: BoxId, b: BoxId) -> &mut Self {
        if !self.links[a.index()].contains(&b) {
            self.links[a.index()].push(b);
        }
        if !self.links[b.index()].contains(&a) {
            self.links[b.index()].push(a);
        }
        self
    }

    /// Treat the `a`–`b` link as absent when zoning the alternate flip state.
    pub fn sever_in_alternate(&mut self, a: BoxId, b: BoxId) -> &mut Self {
        self.severed_in_alternate.push((a, b));
        self
    }

    pub fn build(self) -> BoxGraph {
        let mut boxes = self.boxes;
        let mut overlaps = Vec::new();
        for (i, links) in self.links.iter().enumerate() {
            boxes[i].overlap_start = overlaps.len() as u32;
            boxes[i].overlap_len = links.len() as u16;
            overlaps.extend_from_slice(links);
        }

        let severed = &self.severed_in_alternate;
        let is_severed = |a: BoxId, b: BoxId| {
            severed
                .iter()
                .any(|&(p, q)| (p == a && q == b) || (p == b && q == a))
        };

        let zone_set = |alternate: bool| ZoneSet {
            quarter_step: flood_zones(&boxes, &self.links, Some(STEP_SIZE), |a, b| {
                alternate && is_severed(a, b)
            }),
            half_step: flood_zones(&boxes, &self.links, Some(STEP_SIZE * 2), |a, b| {
                alternate && is_severed(a, b)
            }),
            fly: flood_zones(&boxes, &self.links, None, |a, b| alternate && is_severed(a, b)),
        };
        let zones = ZoneTables {
            base: zone_set(false),
            alternate: zone_set(true),
        };

        BoxGraph {
            boxes,
            overlaps,
            zones,
        }
    }
}

/// Label connected components, joining linked boxes whose floor difference
/// is within `max_rise` (`None` = unlimited) and that `skip` doesn't veto.
fn flood_zones(
    boxes: &[NavBox],
    links: &[Vec<BoxId>],
    max_rise: Option<i32>,
    skip: impl Fn(BoxId, BoxId) -> bool,
) -> Vec<ZoneId> {
    let mut zones: Vec<Option<ZoneId>> = vec![None; boxes.len()];
    let mut next_zone = 0u16;
    let mut stack = Vec::new();

    for seed in 0..boxes.len() {
        if zones[seed].is_some() {
            continue;
        }
        let zone = ZoneId(next_zone);
        next_zone += 1;
        zones[seed] = Some(zone);
        stack.push(BoxId(seed as u16));

        while let Some(current) = stack.pop() {
            let floor = boxes[current.index()].floor;
            for &neighbor in &links[current.index()] {
                if zones[neighbor.index()].is_some() || skip(current, neighbor) {
                    continue;
                }
                let rise = (boxes[neighbor.index()].floor - floor).abs();
                if max_rise.is_some_and(|limit| rise > limit) {
                    continue;
                }
                zones[neighbor.index()] = Some(zone);
                stack.push(neighbor);
            }
        }
    }

    zones.into_iter().map(|z| z.unwrap_or(ZoneId(0))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_step_corridor() -> BoxGraph {
        // a (floor 0) - b (floor 256) - c (floor 768)
        let mut builder = BoxGraphBuilder::new();
        let a = builder.add_box(BoxRect::sectors(0, 2, 0, 2), 0);
        let b = builder.add_box(BoxRect::sectors(2, 4, 0, 2), STEP_SIZE);
        let c = builder.add_box(BoxRect::sectors(4, 6, 0, 2), STEP_SIZE * 3);
        builder.connect(a, b).connect(b, c);
        builder.build()
    }

    #[test]
    fn add_box_assigns_sequential_ids() {
        let mut builder = BoxGraphBuilder::new();
        let a = builder.add_box(BoxRect::sectors(0, 1, 0, 1), 0);
        let b = builder.add_box(BoxRect::sectors(1, 2, 0, 1), 0);
        assert_eq!(a, BoxId(0));
        assert_eq!(b, BoxId(1));
        assert_eq!(builder.build().box_count(), 2);
    }

    #[test]
    fn connect_is_two_way_and_idempotent() {
        let mut builder = BoxGraphBuilder::new();
        let a = builder.add_box(BoxRect::sectors(0, 1, 0, 1), 0);
        let b = builder.add_box(BoxRect::sectors(1, 2, 0, 1), 0);
        builder.connect(a, b).connect(b, a);
        let graph = builder.build();
        assert_eq!(graph.neighbors(a), &[b]);
        assert_eq!(graph.neighbors(b), &[a]);
    }

    #[test]
    fn zones_split_by_step_height() {
        let graph = three_step_corridor();
        let (a, b, c) = (BoxId(0), BoxId(1), BoxId(2));
        let q = LocomotionClass::QuarterStep;
        let h = LocomotionClass::HalfStep;
        let base = FlipState::Base;

        // Quarter-step: a-b joined (256), b-c split (512).
        assert_eq!(graph.zone(a, q, base), graph.zone(b, q, base));
        assert_ne!(graph.zone(b, q, base), graph.zone(c, q, base));
        // Half-step joins everything.
        assert_eq!(graph.zone(a, h, base), graph.zone(c, h, base));
        // Fly joins everything.
        assert_eq!(
            graph.zone(a, LocomotionClass::Fly, base),
            graph.zone(c, LocomotionClass::Fly, base)
        );
    }

    #[test]
    fn severed_link_only_splits_alternate_zones() {
        let mut builder = BoxGraphBuilder::new();
        let a = builder.add_box(BoxRect::sectors(0, 1, 0, 1), 0);
        let b = builder.add_box(BoxRect::sectors(1, 2, 0, 1), 0);
        builder.connect(a, b).sever_in_alternate(a, b);
        let graph = builder.build();
        let q = LocomotionClass::QuarterStep;
        assert_eq!(graph.zone(a, q, FlipState::Base), graph.zone(b, q, FlipState::Base));
        assert_ne!(
            graph.zone(a, q, FlipState::Alternate),
            graph.zone(b, q, FlipState::Alternate)
        );
    }

    #[test]
    fn boxes_in_zone_lists_members_in_order() {
        let graph = three_step_corridor();
        let q = LocomotionClass::QuarterStep;
        let zone = graph.zone(BoxId(0), q, FlipState::Base);
        assert_eq!(
            graph.boxes_in_zone(zone, q, FlipState::Base),
            vec![BoxId(0), BoxId(1)]
        );
    }

    #[test]
    fn from_raw_decodes_terminated_runs_and_flags() {
        let raw = [
            RawBox {
                x_min: 0,
                x_max: 1024,
                z_min: 0,
                z_max: 1024,
                floor: 0,
                overlap_index: 0,
            },
            RawBox {
                x_min: 1024,
                x_max: 2048,
                z_min: 0,
                z_max: 1024,
                floor: 0,
                overlap_index: 1 | BoxFlags::BLOCKED.bits(),
            },
            RawBox {
                x_min: 2048,
                x_max: 3072,
                z_min: 0,
                z_max: 1024,
                floor: 0,
                overlap_index: RAW_NO_OVERLAPS | BoxFlags::BLOCKABLE.bits(),
            },
        ];
        // box0 -> [1], box1 -> [0, 2]
        let words = [1 | RAW_END_BIT, 0, 2 | RAW_END_BIT];
        let zeros = vec![ZoneId(0); 3];
        let set = ZoneSet {
            quarter_step: zeros.clone(),
            half_step: zeros.clone(),
            fly: zeros,
        };
        let zones = ZoneTables {
            base: set.clone(),
            alternate: set,
        };
        let graph = BoxGraph::from_raw(&raw, &words, zones).unwrap();

        assert_eq!(graph.neighbors(BoxId(0)), &[BoxId(1)]);
        assert_eq!(graph.neighbors(BoxId(1)), &[BoxId(0), BoxId(2)]);
        assert!(graph.neighbors(BoxId(2)).is_empty());
        assert_eq!(graph.nav_box(BoxId(1)).flags, BoxFlags::BLOCKED);
        assert_eq!(graph.nav_box(BoxId(2)).flags, BoxFlags::BLOCKABLE);
        // Iteration is restartable.
        assert_eq!(graph.neighbors(BoxId(1)).len(), 2);
    }

    #[test]
    fn from_raw_rejects_dangling_neighbor() {
        let raw = [RawBox {
            x_min: 0,
            x_max: 1024,
            z_min: 0,
            z_max: 1024,
            floor: 0,
            overlap_index: 0,
        }];
        let words = [5 | RAW_END_BIT];
        let err = BoxGraph::from_raw(&raw, &words, ZoneTables::default()).unwrap_err();
        assert!(matches!(err, AiError::BoxOutOfRange { index: 5, count: 1 }));
    }

    #[test]
    fn set_blocked_toggles_flag() {
        let mut graph = three_step_corridor();
        graph.set_blocked(BoxId(1), true);
        assert!(graph.nav_box(BoxId(1)).flags.contains(BoxFlags::BLOCKED));
        graph.set_blocked(BoxId(1), false);
        assert!(graph.nav_box(BoxId(1)).flags.is_empty());
    }
}
