// Level fixtures for end-to-end creature AI scenarios.
//
// Builds small but complete levels (box graph plus sector grid) and wraps
// them in a ready-to-run `SimState`, so scenario tests exercise the same
// pipeline the game does: perception, mood, search, target clamp and
// movement, tick after tick.
//
// See also: `tests/full_tick.rs` for the scenarios.

use tombkeeper_sim::config::GameConfig;
use tombkeeper_sim::nav::{BoxFlags, BoxGraph, BoxGraphBuilder, BoxRect};
use tombkeeper_sim::perception::Enemy;
use tombkeeper_sim::sector::SectorGrid;
use tombkeeper_sim::sim::{SimState, TickReport};
use tombkeeper_sim::types::{Angle, BoxId, CreatureId, RoomId, SECTOR_SIZE, STEP_SIZE, WorldPos};

/// Ceiling height used for every fixture room.
pub const CEILING: i32 = 4 * SECTOR_SIZE;

/// Box ids in `tomb_graph()`.
pub const HALL: BoxId = BoxId(0);
pub const LEDGE: BoxId = BoxId(1);
pub const DOOR: BoxId = BoxId(2);
pub const NORTH: BoxId = BoxId(3);
pub const PIT: BoxId = BoxId(4);

/// A hall with a one-step ledge to the east, a blockable doorway north into
/// a second room, and a deep pit east of that room. The hall/ledge joint
/// doesn't exist in the alternate room set.
///
/// ```text
///   z 9 +-----------+--------+
///       |  NORTH    |  PIT   |
///   z 5 +--+----+---+--------+
///          |DOOR|
///   z 4 +--+----+---+--------+
///       |  HALL     | LEDGE  |
///   z 0 +-----------+--------+
///      x 0          6        10
/// ```
pub fn tomb_graph() -> BoxGraph {
    let mut builder = BoxGraphBuilder::new();
    let hall = builder.add_box(BoxRect::sectors(0, 6, 0, 4), 0);
    let ledge = builder.add_box(BoxRect::sectors(6, 10, 0, 4), STEP_SIZE);
    let door = builder.add_box(BoxRect::sectors(2, 4, 4, 5), 0);
    let north = builder.add_box(BoxRect::sectors(0, 6, 5, 9), 0);
    let pit = builder.add_box(BoxRect::sectors(6, 10, 5, 9), -3 * STEP_SIZE);
    builder
        .set_flags(door, BoxFlags::BLOCKABLE)
        .connect(hall, ledge)
        .connect(hall, door)
        .connect(door, north)
        .connect(north, pit)
        .connect(ledge, pit)
        .sever_in_alternate(hall, ledge);
    builder.build()
}

/// Graph and matching sector grid, all in room 0.
pub fn tomb_level() -> (BoxGraph, SectorGrid) {
    let graph = tomb_graph();
    let sectors = SectorGrid::from_graph(&graph, CEILING, RoomId(0));
    (graph, sectors)
}

/// The player, alive, standing somewhere in the level.
pub fn player_at(pos: WorldPos, yaw: Angle) -> Enemy {
    Enemy {
        box_id: None,
        pos,
        yaw,
        health: 1000,
        aim_height: 700,
    }
}

/// A `SimState` on the tomb level with the default config and the player at
/// `player`, box resolved.
pub fn tomb_sim(seed: u64, player: WorldPos) -> SimState {
    let (graph, sectors) = tomb_level();
    let enemy = player_at(player, Angle::ZERO);
    let mut sim = SimState::new(GameConfig::default(), graph, sectors, enemy, seed);
    sim.place_enemy(player, Angle::ZERO);
    sim
}

/// Run `ticks` ticks, collecting every report.
pub fn run_ticks(sim: &mut SimState, ticks: usize) -> Vec<TickReport> {
    let mut all = Vec::new();
    for _ in 0..ticks {
        all.extend(sim.step().expect("tick failed"));
    }
    all
}

/// The boxes one creature occupied over a run, in tick order.
pub fn boxes_visited(reports: &[TickReport], id: CreatureId) -> Vec<BoxId> {
    reports
        .iter()
        .filter(|r| r.creature == id)
        .filter_map(|r| r.outcome.box_id)
        .collect()
}
