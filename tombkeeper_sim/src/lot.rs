// Per-creature incremental path search over the box graph ("LOT").
//
// Each creature owns a `LotInfo`: one `BoxNode` per box in the level, a
// FIFO frontier threaded through the nodes (`head`/`tail` plus each node's
// `next_expansion`), a search generation counter, and the goal
// (`target_box`, `required_box`, `target`).
//
// ## Search
//
// The search runs *backwards* from the goal. `update_path()` re-roots it
// when the mood FSM asks for a new box (`required_box`): the generation is
// bumped, the goal box is stamped live and pushed at the head of the
// frontier. `search_path()` then pops up to `max_depth` boxes per tick and
// relaxes their neighbors. A neighbor reached this way gets
// `exit_box = popped`, so following `exit_box` from any stamped box walks
// toward the goal. Work from older generations is never cleared eagerly;
// a node whose stamp is older than the popped box's simply gets
// overwritten.
//
// A neighbor is skipped when it lies in another zone, when the rise from it
// to the popped box is outside the creature's step/drop window, or when it
// already carries a live stamp of this generation. Boxes whose flags
// intersect `block_mask` are stamped *tombstoned*: they are queued (so the
// search can see past them) but never get an exit, and everything reached
// only through them inherits the tombstone.
//
// The generation is 15 bits wide. On wrap every node and the frontier are
// reset and the search restarts from generation 1.
//
// ## Target clamp
//
// `calculate_target()` turns the exit chain into one steering point for
// this tick. Starting from the creature's box it walks `exit_box` links,
// intersecting a corridor rectangle as it goes, and clamps the target just
// inside each box the creature must enter. If the chain reaches
// `target_box` the result is `Prime`; if the corridor bends so a straight
// line no longer works it stops early with a `Secondary` point at the
// corner; if the chain ends or is blocked it picks a random point inside
// the corridor and reports `Unresolved`.
//
// See also: `nav.rs` for the graph searched here, `mood.rs` which chooses
// `required_box`, `movement.rs` which consumes the steering point.
//
// **Critical constraint: determinism.** The only randomness is the
// injected `GameRng`; neighbor order is the graph's overlap order.

use crate::nav::{BoxFlags, BoxGraph, NavBox};
use crate::prng::GameRng;
use crate::species::MovementProfile;
use crate::types::{BoxId, FlipState, HALF_SECTOR, LocomotionClass, SECTOR_SIZE, WorldPos};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Generations are 15 bits; reaching this value resets the search.
pub const MAX_GENERATION: u16 = 0x7FFF;

/// When a node was last reached, and whether through a blocked box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStamp {
    pub generation: u16,
    pub tombstoned: bool,
}

impl SearchStamp {
    pub fn live(generation: u16) -> Self {
        Self {
            generation,
            tombstoned: false,
        }
    }

    pub fn tombstone(generation: u16) -> Self {
        Self {
            generation,
            tombstoned: true,
        }
    }
}

/// Per-creature search state for one box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxNode {
    /// Next box toward the goal.
    pub exit_box: Option<BoxId>,
    pub search: SearchStamp,
    /// Frontier link. `Some` means the box is queued (unless it's the tail).
    pub next_expansion: Option<BoxId>,
}

/// Step/drop/fly limits as the search and movement see them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLimits {
    pub step: i32,
    pub drop: i32,
    pub fly: i32,
}

impl MovementLimits {
    pub fn is_flying(&self) -> bool {
        self.fly != 0
    }

    /// Whether a rise (positive up) between adjacent boxes is allowed.
    pub fn allows_rise(&self, rise: i32) -> bool {
        rise <= self.step && rise >= self.drop
    }
}

/// How far the target clamp got along the exit chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    /// The chain reached `target_box`.
    Prime,
    /// The corridor bent; this is the corner to head for first.
    Secondary,
    /// The chain ended or was blocked before the goal.
    Unresolved,
}

/// A resolved steering point for this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteeringTarget {
    pub pos: WorldPos,
    pub kind: TargetKind,
}

impl SteeringTarget {
    pub fn reached_final_box(&self) -> bool {
        self.kind == TargetKind::Prime
    }
}

bitflags! {
    /// Corridor sides still free while clamping. A `*_MIN` flag means the
    /// creature is on the low side of that axis and enters through the box's
    /// min edge.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Unclamped: u8 {
        const Z_MIN = 1;
        const Z_MAX = 2;
        const X_MIN = 4;
        const X_MAX = 8;
        const SECONDARY = 16;
        const EDGES = 15;
        const Z_AXIS = Self::Z_MIN.bits() | Self::Z_MAX.bits();
        const X_AXIS = Self::X_MIN.bits() | Self::X_MAX.bits();
    }
}

/// Clamp without panicking when the range is empty (`lo > hi` favors `lo`).
fn soft_clamp(value: i32, lo: i32, hi: i32) -> i32 {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}

/// The corridor rectangle narrowed during the clamp.
#[derive(Clone, Copy, Debug)]
struct Corridor {
    x_min: i32,
    x_max: i32,
    z_min: i32,
    z_max: i32,
}

impl Corridor {
    fn of(b: &NavBox) -> Self {
        Self {
            x_min: b.x_min,
            x_max: b.x_max,
            z_min: b.z_min,
            z_max: b.z_max,
        }
    }
}

/// One creature's path search and goal.
#[derive(Clone, Debug, Default)]
pub struct LotInfo {
    nodes: Vec<BoxNode>,
    head: Option<BoxId>,
    tail: Option<BoxId>,
    generation: u16,
    pub block_mask: BoxFlags,
    pub limits: MovementLimits,
    pub class: LocomotionClass,
    /// The box the current search is rooted at.
    pub target_box: Option<BoxId>,
    /// The box the FSM wants; becomes `target_box` on the next `update_path`.
    pub required_box: Option<BoxId>,
    /// The goal point inside `target_box`.
    pub target: WorldPos,
    /// Height above the floor flyers aim for.
    pub fly_clearance: i32,
    zone_boxes: Vec<BoxId>,
}

impl LotInfo {
    pub fn new(graph: &BoxGraph, movement: &MovementProfile, fly_clearance: i32) -> Self {
        let mut lot = Self {
            nodes: vec![BoxNode::default(); graph.box_count()],
            fly_clearance,
            ..Self::default()
        };
        lot.set_movement(movement);
        lot
    }

    /// Adopt a locomotion profile. Callers reset the search afterwards.
    pub fn set_movement(&mut self, movement: &MovementProfile) {
        self.block_mask = movement.block_mask;
        self.limits = MovementLimits {
            step: movement.step,
            drop: movement.drop,
            fly: movement.fly,
        };
        self.class = movement.class();
    }

    /// Clear all search state and the goal, sized for `box_count` boxes.
    pub fn reset(&mut self, box_count: usize) {
        self.nodes.clear();
        self.nodes.resize(box_count, BoxNode::default());
        self.head = None;
        self.tail = None;
        self.generation = 0;
        self.target_box = None;
        self.required_box = None;
    }

    /// Recompute the list of boxes sharing the creature's zone.
    pub fn rebuild_zone(&mut self, graph: &BoxGraph, creature_box: Option<BoxId>, flip: FlipState) {
        self.zone_boxes = match creature_box {
            Some(b) => graph.boxes_in_zone(graph.zone(b, self.class, flip), self.class, flip),
            None => Vec::new(),
        };
    }

    /// Boxes in the creature's zone, as of the last `rebuild_zone`.
    pub fn zone_boxes(&self) -> &[BoxId] {
        &self.zone_boxes
    }

    pub fn node(&self, id: BoxId) -> &BoxNode {
        &self.nodes[id.index()]
    }

    pub fn exit_box(&self, id: BoxId) -> Option<BoxId> {
        self.nodes[id.index()].exit_box
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }

    /// No boxes left to expand.
    pub fn is_search_exhausted(&self) -> bool {
        self.head.is_none()
    }

    /// Whether `id` was reached only through a blocked box in the current
    /// search.
    pub fn is_tombstoned_now(&self, id: BoxId) -> bool {
        self.nodes[id.index()].search == SearchStamp::tombstone(self.generation)
    }

    /// Aim at a random point inside `id`, inset half a sector from each
    /// edge, and ask for the search to be rooted there.
    pub fn set_random_search_target(&mut self, graph: &BoxGraph, id: BoxId, rng: &mut GameRng) {
        let b = graph.nav_box(id);
        self.required_box = Some(id);
        self.target.x = b.x_min + HALF_SECTOR + rng.scaled(b.x_max - b.x_min - SECTOR_SIZE);
        self.target.z = b.z_min + HALF_SECTOR + rng.scaled(b.z_max - b.z_min - SECTOR_SIZE);
        self.target.y = if self.limits.is_flying() {
            b.floor + self.fly_clearance
        } else {
            b.floor
        };
    }

    /// Re-root on a new `required_box` if needed, then spend up to
    /// `max_depth` expansions on the search.
    pub fn update_path(&mut self, graph: &BoxGraph, flip: FlipState, max_depth: u16) {
        if let Some(required) = self.required_box.filter(|&r| Some(r) != self.target_box) {
            self.reroot(required);
        }
        self.search_path(graph, flip, max_depth);
    }

    fn reroot(&mut self, required: BoxId) {
        if self.generation >= MAX_GENERATION {
            warn!(
                generation = self.generation,
                "lot_generation_wrap: resetting search"
            );
            for node in &mut self.nodes {
                *node = BoxNode::default();
            }
            self.head = None;
            self.tail = None;
            self.generation = 0;
        }
        self.generation += 1;
        self.target_box = Some(required);
        debug!(target_box = %required, generation = self.generation, "lot_reroot");

        let node = &mut self.nodes[required.index()];
        node.exit_box = None;
        node.search = SearchStamp::live(self.generation);
        if node.next_expansion.is_none() && self.tail != Some(required) {
            node.next_expansion = self.head;
            if self.head.is_none() {
                self.tail = Some(required);
            }
            self.head = Some(required);
        }
    }

    fn push_back(&mut self, id: BoxId) {
        match self.tail {
            Some(tail) => self.nodes[tail.index()].next_expansion = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    /// Expand up to `max_depth` frontier boxes.
    pub fn search_path(&mut self, graph: &BoxGraph, flip: FlipState, max_depth: u16) {
        for _ in 0..max_depth {
            let Some(current) = self.head else {
                self.tail = None;
                return;
            };
            let current_stamp = self.nodes[current.index()].search;
            let current_zone = graph.zone(current, self.class, flip);
            let current_floor = graph.nav_box(current).floor;

            for &neighbor in graph.neighbors(current) {
                if graph.zone(neighbor, self.class, flip) != current_zone {
                    continue;
                }
                let neighbor_box = graph.nav_box(neighbor);
                if !self.limits.allows_rise(current_floor - neighbor_box.floor) {
                    continue;
                }

                let node = &mut self.nodes[neighbor.index()];
                if node.search.generation > current_stamp.generation {
                    continue;
                }
                if current_stamp.tombstoned {
                    if node.search.generation == current_stamp.generation {
                        continue;
                    }
                    node.search = current_stamp;
                } else {
                    if node.search == current_stamp {
                        continue;
                    }
                    if neighbor_box.flags.intersects(self.block_mask) {
                        node.search = SearchStamp::tombstone(current_stamp.generation);
                    } else {
                        node.search = current_stamp;
                        node.exit_box = Some(current);
                    }
                }

                let queued = node.next_expansion.is_some();
                if !queued && self.tail != Some(neighbor) {
                    self.push_back(neighbor);
                }
            }

            self.head = self.nodes[current.index()].next_expansion.take();
            if self.head.is_none() {
                self.tail = None;
            }
        }
    }

    /// Resolve this tick's steering point by walking the exit chain from
    /// `creature_box`. With no box the stored goal comes back unchanged.
    pub fn calculate_target(
        &self,
        graph: &BoxGraph,
        creature_box: Option<BoxId>,
        position: WorldPos,
        rng: &mut GameRng,
    ) -> SteeringTarget {
        let Some(start) = creature_box else {
            return SteeringTarget {
                pos: self.target,
                kind: TargetKind::Unresolved,
            };
        };

        let clearance = if self.limits.is_flying() {
            self.fly_clearance
        } else {
            0
        };
        let mut target = position;
        let mut corridor = Corridor::of(graph.nav_box(start));
        let mut free = Unclamped::EDGES;
        let mut current = start;
        let secondary = |target: WorldPos| SteeringTarget {
            pos: target,
            kind: TargetKind::Secondary,
        };

        for _ in 0..=graph.box_count() {
            let b = graph.nav_box(current);
            target.y = target.y.max(b.floor + clearance);

            if b.contains(position.x, position.z) {
                corridor = Corridor::of(b);
            } else {
                if position.z < b.z_min {
                    if free.contains(Unclamped::Z_MIN)
                        && position.x >= corridor.x_min
                        && position.x < corridor.x_max
                    {
                        target.z = target.z.max(b.z_min + HALF_SECTOR);
                        if free.contains(Unclamped::SECONDARY) {
                            return secondary(target);
                        }
                        corridor.x_min = corridor.x_min.max(b.x_min);
                        corridor.x_max = corridor.x_max.min(b.x_max);
                        free = Unclamped::Z_MIN;
                    } else if free != Unclamped::Z_MIN {
                        target.z = corridor.z_max - HALF_SECTOR;
                        if free != Unclamped::EDGES {
                            return secondary(target);
                        }
                        free |= Unclamped::SECONDARY;
                    }
                } else if position.z >= b.z_max {
                    if free.contains(Unclamped::Z_MAX)
                        && position.x >= corridor.x_min
                        && position.x < corridor.x_max
                    {
                        target.z = target.z.min(b.z_max - HALF_SECTOR);
                        if free.contains(Unclamped::SECONDARY) {
                            return secondary(target);
                        }
                        corridor.x_min = corridor.x_min.max(b.x_min);
                        corridor.x_max = corridor.x_max.min(b.x_max);
                        free = Unclamped::Z_MAX;
                    } else if free != Unclamped::Z_MAX {
                        target.z = corridor.z_min + HALF_SECTOR;
                        if free != Unclamped::EDGES {
                            return secondary(target);
                        }
                        free |= Unclamped::SECONDARY;
                    }
                }

                if position.x < b.x_min {
                    if free.contains(Unclamped::X_MIN)
                        && position.z >= corridor.z_min
                        && position.z < corridor.z_max
                    {
                        target.x = target.x.max(b.x_min + HALF_SECTOR);
                        if free.contains(Unclamped::SECONDARY) {
                            return secondary(target);
                        }
                        corridor.z_min = corridor.z_min.max(b.z_min);
                        corridor.z_max = corridor.z_max.min(b.z_max);
                        free = Unclamped::X_MIN;
                    } else if free != Unclamped::X_MIN {
                        target.x = corridor.x_max - HALF_SECTOR;
                        if free != Unclamped::EDGES {
                            return secondary(target);
                        }
                        free |= Unclamped::SECONDARY;
                    }
                } else if position.x >= b.x_max {
                    if free.contains(Unclamped::X_MAX)
                        && position.z >= corridor.z_min
                        && position.z < corridor.z_max
                    {
                        target.x = target.x.min(b.x_max - HALF_SECTOR);
                        if free.contains(Unclamped::SECONDARY) {
                            return secondary(target);
                        }
                        corridor.z_min = corridor.z_min.max(b.z_min);
                        corridor.z_max = corridor.z_max.min(b.z_max);
                        free = Unclamped::X_MAX;
                    } else if free != Unclamped::X_MAX {
                        target.x = corridor.x_min + HALF_SECTOR;
                        if free != Unclamped::EDGES {
                            return secondary(target);
                        }
                        free |= Unclamped::SECONDARY;
                    }
                }
            }

            if Some(current) == self.target_box {
                if free.intersects(Unclamped::Z_AXIS) {
                    target.z = self.target.z;
                } else if !free.contains(Unclamped::SECONDARY) {
                    target.z = soft_clamp(target.z, b.z_min + HALF_SECTOR, b.z_max - HALF_SECTOR);
                }
                if free.intersects(Unclamped::X_AXIS) {
                    target.x = self.target.x;
                } else if !free.contains(Unclamped::SECONDARY) {
                    target.x = soft_clamp(target.x, b.x_min + HALF_SECTOR, b.x_max - HALF_SECTOR);
                }
                target.y = self.target.y;
                return SteeringTarget {
                    pos: target,
                    kind: TargetKind::Prime,
                };
            }

            match self.nodes[current.index()].exit_box {
                Some(next) if !graph.nav_box(next).flags.intersects(self.block_mask) => {
                    current = next;
                }
                _ => break,
            }
        }

        // The chain ran out: wander somewhere inside the corridor.
        if free.intersects(Unclamped::Z_AXIS) {
            target.z = corridor.z_min
                + HALF_SECTOR
                + rng.scaled(corridor.z_max - corridor.z_min - SECTOR_SIZE);
        } else if !free.contains(Unclamped::SECONDARY) {
            target.z = soft_clamp(
                target.z,
                corridor.z_min + HALF_SECTOR,
                corridor.z_max - HALF_SECTOR,
            );
        }
        if free.intersects(Unclamped::X_AXIS) {
            target.x = corridor.x_min
                + HALF_SECTOR
                + rng.scaled(corridor.x_max - corridor.x_min - SECTOR_SIZE);
        } else if !free.contains(Unclamped::SECONDARY) {
            target.x = soft_clamp(
                target.x,
                corridor.x_min + HALF_SECTOR,
                corridor.x_max - HALF_SECTOR,
            );
        }
        target.y = graph.nav_box(current).floor + clearance;

        SteeringTarget {
            pos: target,
            kind: TargetKind::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::{BoxGraphBuilder, BoxRect};
    use crate::types::STEP_SIZE;

    /// Five 1×1-sector boxes in a row along +X, all at floor 0.
    fn straight_corridor() -> BoxGraph {
        let mut builder = BoxGraphBuilder::new();
        let ids: Vec<BoxId> = (0..5)
            .map(|i| builder.add_box(BoxRect::sectors(i, i + 1, 0, 1), 0))
            .collect();
        for pair in ids.windows(2) {
            builder.connect(pair[0], pair[1]);
        }
        builder.build()
    }

    fn walker_lot(graph: &BoxGraph) -> LotInfo {
        LotInfo::new(graph, &MovementProfile::walker(), 384)
    }

    fn hops_to_target(lot: &LotInfo, from: BoxId, limit: usize) -> Option<usize> {
        let mut current = from;
        for hops in 0..=limit {
            if Some(current) == lot.target_box {
                return Some(hops);
            }
            current = lot.exit_box(current)?;
        }
        None
    }

    #[test]
    fn search_reaches_start_within_budget() {
        let graph = straight_corridor();
        let mut lot = walker_lot(&graph);
        let mut rng = GameRng::new(1);
        lot.set_random_search_target(&graph, BoxId(4), &mut rng);
        lot.update_path(&graph, FlipState::Base, 10);

        // Every box has an acyclic chain whose length strictly shrinks.
        for i in 0..5u16 {
            let hops = hops_to_target(&lot, BoxId(i), 5).unwrap();
            assert_eq!(hops, usize::from(4 - i));
        }
        assert!(lot.is_search_exhausted());
    }

    #[test]
    fn search_respects_per_tick_budget() {
        let graph = straight_corridor();
        let mut lot = walker_lot(&graph);
        let mut rng = GameRng::new(1);
        lot.set_random_search_target(&graph, BoxId(4), &mut rng);
        lot.update_path(&graph, FlipState::Base, 1);
        // Only the goal was expanded: box 3 is reachable, box 2 not yet.
        assert_eq!(lot.exit_box(BoxId(3)), Some(BoxId(4)));
        assert_eq!(lot.exit_box(BoxId(2)), None);
        lot.update_path(&graph, FlipState::Base, 1);
        assert_eq!(lot.exit_box(BoxId(2)), Some(BoxId(3)));
    }

    #[test]
    fn random_search_target_stays_inset() {
        let mut builder = BoxGraphBuilder::new();
        let b = builder.add_box(BoxRect::sectors(2, 7, -3, 1), 128);
        let graph = builder.build();
        let nav = *graph.nav_box(b);
        for seed in 0..1000 {
            let mut lot = walker_lot(&graph);
            let mut rng = GameRng::new(seed);
            lot.set_random_search_target(&graph, b, &mut rng);
            let t = lot.target;
            assert!(t.x >= nav.x_min + HALF_SECTOR && t.x < nav.x_max - HALF_SECTOR);
            assert!(t.z >= nav.z_min + HALF_SECTOR && t.z < nav.z_max - HALF_SECTOR);
            assert_eq!(t.y, 128);
            assert_eq!(lot.required_box, Some(b));
        }
    }

    #[test]
    fn flyers_aim_above_the_floor() {
        let graph = straight_corridor();
        let mut lot = LotInfo::new(&graph, &MovementProfile::flyer(16), 384);
        let mut rng = GameRng::new(3);
        lot.set_random_search_target(&graph, BoxId(2), &mut rng);
        assert_eq!(lot.target.y, 384);
    }

    #[test]
    fn unchanged_required_box_does_not_reroot() {
        let graph = straight_corridor();
        let mut lot = walker_lot(&graph);
        let mut rng = GameRng::new(9);
        lot.set_random_search_target(&graph, BoxId(3), &mut rng);
        lot.update_path(&graph, FlipState::Base, 5);
        let generation = lot.generation();
        lot.update_path(&graph, FlipState::Base, 5);
        assert_eq!(lot.generation(), generation);
        assert_eq!(lot.target_box, Some(BoxId(3)));
    }

    #[test]
    fn steps_beyond_limit_are_not_linked() {
        let mut builder = BoxGraphBuilder::new();
        let low = builder.add_box(BoxRect::sectors(0, 1, 0, 1), 0);
        let high = builder.add_box(BoxRect::sectors(1, 2, 0, 1), 2 * STEP_SIZE);
        builder.connect(low, high);
        let graph = builder.build();
        // Zones agree for the fly class, so only the step window rejects.
        let mut lot = walker_lot(&graph);
        lot.class = LocomotionClass::Fly;
        let mut rng = GameRng::new(2);
        lot.set_random_search_target(&graph, high, &mut rng);
        lot.update_path(&graph, FlipState::Base, 5);
        assert_eq!(lot.exit_box(low), None);

        // Dropping down is within the window.
        lot.set_random_search_target(&graph, low, &mut rng);
        lot.update_path(&graph, FlipState::Base, 5);
        assert_eq!(lot.exit_box(high), Some(low));
    }

    #[test]
    fn blocked_box_tombstones_everything_behind_it() {
        let mut builder = BoxGraphBuilder::new();
        let ids: Vec<BoxId> = (0..4)
            .map(|i| builder.add_box(BoxRect::sectors(i, i + 1, 0, 1), 0))
            .collect();
        for pair in ids.windows(2) {
            builder.connect(pair[0], pair[1]);
        }
        builder.set_flags(ids[1], BoxFlags::BLOCKED);
        let graph = builder.build();
        let mut lot = walker_lot(&graph);
        let mut rng = GameRng::new(4);
        lot.set_random_search_target(&graph, ids[0], &mut rng);
        lot.update_path(&graph, FlipState::Base, 10);

        assert!(lot.is_tombstoned_now(ids[1]));
        assert!(lot.is_tombstoned_now(ids[2]));
        assert!(lot.is_tombstoned_now(ids[3]));
        assert_eq!(lot.exit_box(ids[1]), None);
        assert_eq!(lot.exit_box(ids[3]), None);
    }

    #[test]
    fn generation_wrap_resets_nodes() {
        let graph = straight_corridor();
        let mut lot = walker_lot(&graph);
        let mut rng = GameRng::new(5);
        lot.set_random_search_target(&graph, BoxId(4), &mut rng);
        lot.update_path(&graph, FlipState::Base, 10);
        assert!(lot.exit_box(BoxId(0)).is_some());

        lot.generation = MAX_GENERATION;
        lot.set_random_search_target(&graph, BoxId(0), &mut rng);
        lot.update_path(&graph, FlipState::Base, 0);
        assert_eq!(lot.generation(), 1);
        assert_eq!(lot.exit_box(BoxId(0)), None);
        assert_eq!(lot.node(BoxId(3)).search, SearchStamp::default());
    }

    #[test]
    fn zero_hop_target_is_prime_and_exact() {
        let graph = straight_corridor();
        let mut lot = walker_lot(&graph);
        let mut rng = GameRng::new(6);
        lot.set_random_search_target(&graph, BoxId(2), &mut rng);
        lot.update_path(&graph, FlipState::Base, 5);

        let here = WorldPos::new(2 * SECTOR_SIZE + 100, 0, 900);
        let steering = lot.calculate_target(&graph, Some(BoxId(2)), here, &mut rng);
        assert_eq!(steering.kind, TargetKind::Prime);
        assert!(steering.reached_final_box());
        assert_eq!(steering.pos, lot.target);
    }

    #[test]
    fn straight_corridor_resolves_prime() {
        let graph = straight_corridor();
        let mut lot = walker_lot(&graph);
        let mut rng = GameRng::new(7);
        lot.set_random_search_target(&graph, BoxId(3), &mut rng);
        lot.update_path(&graph, FlipState::Base, 10);

        let here = WorldPos::new(512, 0, 512);
        let steering = lot.calculate_target(&graph, Some(BoxId(0)), here, &mut rng);
        assert_eq!(steering.kind, TargetKind::Prime);
        assert_eq!(steering.pos.x, lot.target.x);
        assert_eq!(steering.pos.y, lot.target.y);
        assert_eq!(steering.pos.z, 512);
    }

    #[test]
    fn bent_corridor_stops_at_corner() {
        // box0 -> box1 (east) -> box2 (north of box1)
        let mut builder = BoxGraphBuilder::new();
        let b0 = builder.add_box(BoxRect::sectors(0, 1, 0, 1), 0);
        let b1 = builder.add_box(BoxRect::sectors(1, 2, 0, 1), 0);
        let b2 = builder.add_box(BoxRect::sectors(1, 2, 1, 3), 0);
        builder.connect(b0, b1).connect(b1, b2);
        let graph = builder.build();
        let mut lot = walker_lot(&graph);
        let mut rng = GameRng::new(8);
        lot.set_random_search_target(&graph, b2, &mut rng);
        lot.update_path(&graph, FlipState::Base, 10);

        let here = WorldPos::new(512, 0, 512);
        let steering = lot.calculate_target(&graph, Some(b0), here, &mut rng);
        assert_eq!(steering.kind, TargetKind::Secondary);
        assert_eq!(steering.pos.x, SECTOR_SIZE + HALF_SECTOR);
        assert_eq!(steering.pos.z, 512);
    }

    #[test]
    fn dead_end_wanders_inside_own_box() {
        let graph = straight_corridor();
        let mut lot = walker_lot(&graph);
        let mut rng = GameRng::new(10);
        lot.target_box = Some(BoxId(4));
        // No search has run, so box 1 has no exit.
        let here = WorldPos::new(SECTOR_SIZE + 300, 0, 300);
        let steering = lot.calculate_target(&graph, Some(BoxId(1)), here, &mut rng);
        assert_eq!(steering.kind, TargetKind::Unresolved);
        assert_eq!(steering.pos.x, SECTOR_SIZE + HALF_SECTOR);
        assert_eq!(steering.pos.z, HALF_SECTOR);
    }

    #[test]
    fn no_box_returns_stored_target() {
        let graph = straight_corridor();
        let mut lot = walker_lot(&graph);
        lot.target = WorldPos::new(1, 2, 3);
        let mut rng = GameRng::new(11);
        let steering = lot.calculate_target(&graph, None, WorldPos::default(), &mut rng);
        assert_eq!(steering.pos, WorldPos::new(1, 2, 3));
        assert_eq!(steering.kind, TargetKind::Unresolved);
    }

    #[test]
    fn rebuild_zone_lists_same_zone_boxes() {
        let graph = straight_corridor();
        let mut lot = walker_lot(&graph);
        lot.rebuild_zone(&graph, Some(BoxId(2)), FlipState::Base);
        assert_eq!(lot.zone_boxes().len(), 5);
        lot.rebuild_zone(&graph, None, FlipState::Base);
        assert!(lot.zone_boxes().is_empty());
    }
}
