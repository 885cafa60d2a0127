// End-to-end scenarios for the creature AI pipeline.
//
// Each test builds a real level (see `scenario_tests::tomb_level`), spawns
// creatures into a real `SimState`, and runs whole ticks: perception, mood,
// search, target clamp and movement reconciliation together. Assertions are
// about what the level allows (which boxes a creature can end up in) and
// about reproducibility, not about exact trajectories.

use scenario_tests::{
    DOOR, HALL, LEDGE, NORTH, boxes_visited, run_ticks, tomb_level, tomb_sim,
};
use tombkeeper_prng::GameRng;
use tombkeeper_sim::config::{APE, BAT, GameConfig, RAPTOR, WOLF};
use tombkeeper_sim::error::AiError;
use tombkeeper_sim::lot::LotInfo;
use tombkeeper_sim::mood::Mood;
use tombkeeper_sim::nav::{BoxFlags, BoxGraph, RawBox, ZoneSet, ZoneTables};
use tombkeeper_sim::sim::SimState;
use tombkeeper_sim::species::MovementProfile;
use tombkeeper_sim::types::{Angle, BoxId, FlipState, SpeciesId, WorldPos, ZoneId};

/// Player standing in the north room.
const PLAYER_NORTH: WorldPos = WorldPos::new(1500, 0, 7000);

// ---------------------------------------------------------------------------
// Level constraints
// ---------------------------------------------------------------------------

#[test]
fn closed_door_keeps_walkers_in_the_hall() {
    let mut sim = tomb_sim(17, PLAYER_NORTH);
    sim.set_box_blocked(DOOR, true).unwrap();
    let wolf = sim
        .spawn_creature(WOLF, WorldPos::new(3000, 0, 3000), Angle::ZERO)
        .unwrap();
    let raptor = sim
        .spawn_creature(RAPTOR, WorldPos::new(2000, 0, 1000), Angle::ZERO)
        .unwrap();

    let reports = run_ticks(&mut sim, 300);
    for id in [wolf, raptor] {
        let visited = boxes_visited(&reports, id);
        assert!(!visited.is_empty());
        assert!(!visited.contains(&DOOR), "{id} walked through a closed door");
        assert!(!visited.contains(&NORTH), "{id} reached the north room");
    }
}

#[test]
fn apes_never_use_blockable_doorways() {
    let mut sim = tomb_sim(23, PLAYER_NORTH);
    let ape = sim
        .spawn_creature(APE, WorldPos::new(3000, 0, 3500), Angle::ZERO)
        .unwrap();
    let reports = run_ticks(&mut sim, 300);
    let visited = boxes_visited(&reports, ape);
    assert!(!visited.contains(&DOOR));
    assert!(!visited.contains(&NORTH));
}

#[test]
fn alternate_room_set_cuts_the_ledge_off() {
    let mut sim = tomb_sim(5, WorldPos::new(1000, 0, 1000));
    let wolf = sim
        .spawn_creature(WOLF, WorldPos::new(8000, 256, 2000), -Angle::DEG_90)
        .unwrap();
    assert_eq!(sim.creature(wolf).unwrap().box_id, Some(LEDGE));
    assert!(sim.creature(wolf).unwrap().lot.zone_boxes().contains(&HALL));

    sim.set_flip(FlipState::Alternate);
    assert_eq!(sim.creature(wolf).unwrap().lot.zone_boxes(), &[LEDGE]);

    let reports = run_ticks(&mut sim, 200);
    let visited = boxes_visited(&reports, wolf);
    assert!(visited.iter().all(|&b| b == LEDGE));
    assert_eq!(sim.creature(wolf).unwrap().pos.y, 256);
}

#[test]
fn creatures_stay_inside_the_level() {
    let mut sim = tomb_sim(99, PLAYER_NORTH);
    for (species, pos) in [
        (WOLF, WorldPos::new(1000, 0, 1000)),
        (RAPTOR, WorldPos::new(5000, 0, 2000)),
        (BAT, WorldPos::new(8000, 600, 7000)),
        (APE, WorldPos::new(3000, 0, 6000)),
    ] {
        sim.spawn_creature(species, pos, Angle::ZERO).unwrap();
    }
    let reports = run_ticks(&mut sim, 250);
    assert_eq!(reports.len(), 4 * 250);
    for report in &reports {
        let b = sim.graph.nav_box(report.outcome.box_id.unwrap());
        assert!(b.contains(report.outcome.pos.x, report.outcome.pos.z));
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn dead_creatures_stop_reporting() {
    let mut sim = tomb_sim(3, PLAYER_NORTH);
    let wolf = sim
        .spawn_creature(WOLF, WorldPos::new(1000, 0, 1000), Angle::ZERO)
        .unwrap();
    let raptor = sim
        .spawn_creature(RAPTOR, WorldPos::new(5000, 0, 2000), Angle::ZERO)
        .unwrap();
    run_ticks(&mut sim, 5);
    sim.damage_creature(wolf, 1000).unwrap();
    let reports = run_ticks(&mut sim, 5);
    assert!(reports.iter().all(|r| r.creature == raptor));
    assert_eq!(reports.len(), 5);
}

#[test]
fn violent_creature_hunts_in_its_zone() {
    let mut sim = tomb_sim(8, WorldPos::new(4500, 0, 3000));
    let raptor = sim
        .spawn_creature(RAPTOR, WorldPos::new(1000, 0, 1000), Angle::ZERO)
        .unwrap();
    let reports = run_ticks(&mut sim, 20);
    assert!(reports.iter().all(|r| r.mood_after == Mood::Attack));
    assert_eq!(sim.creature(raptor).unwrap().mood, Mood::Attack);
}

#[test]
fn unknown_species_in_custom_config() {
    let mut config = GameConfig::default();
    config.species.remove(&BAT);
    let json = serde_json::to_string(&config).unwrap();
    let config = GameConfig::from_json(&json).unwrap();

    let (graph, sectors) = tomb_level();
    let enemy = scenario_tests::player_at(PLAYER_NORTH, Angle::ZERO);
    let mut sim = SimState::new(config, graph, sectors, enemy, 1);
    let err = sim
        .spawn_creature(BAT, WorldPos::new(8000, 600, 7000), Angle::ZERO)
        .unwrap_err();
    assert!(matches!(err, AiError::MissingSpecies(id) if id == BAT));
    assert!(matches!(
        sim.spawn_creature(SpeciesId(0), WorldPos::new(0, 0, 0), Angle::ZERO),
        Err(AiError::MissingSpecies(_))
    ));
}

// ---------------------------------------------------------------------------
// Determinism and persistence
// ---------------------------------------------------------------------------

fn populated(seed: u64) -> SimState {
    let mut sim = tomb_sim(seed, PLAYER_NORTH);
    sim.spawn_creature(WOLF, WorldPos::new(1000, 0, 1000), Angle::ZERO)
        .unwrap();
    sim.spawn_creature(BAT, WorldPos::new(8000, 600, 7000), Angle::DEG_180)
        .unwrap();
    sim.spawn_creature(APE, WorldPos::new(3000, 0, 6000), Angle::DEG_45)
        .unwrap();
    sim
}

#[test]
fn same_seed_same_run() {
    let mut a = populated(1234);
    let mut b = populated(1234);
    let ra = run_ticks(&mut a, 150);
    let rb = run_ticks(&mut b, 150);
    assert_eq!(ra, rb);
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
}

#[test]
fn loads_of_one_save_replay_identically() {
    let mut sim = populated(77);
    run_ticks(&mut sim, 60);
    let json = sim.to_json().unwrap();

    let (graph, sectors) = tomb_level();
    let mut a = SimState::from_json(&json, graph, sectors).unwrap();
    let (graph, sectors) = tomb_level();
    let mut b = SimState::from_json(&json, graph, sectors).unwrap();
    for c in a.creatures.values() {
        assert_eq!(c.mood, Mood::Bored);
        assert_eq!(c.lot.target_box, None);
        assert_eq!(c.pos, sim.creature(c.id).unwrap().pos);
    }
    assert_eq!(run_ticks(&mut a, 60), run_ticks(&mut b, 60));
}

// ---------------------------------------------------------------------------
// Raw level data
// ---------------------------------------------------------------------------

/// Three boxes in a row along X, the middle one blocked:
/// `0 - [1] - 2`. Overlap runs end with the high bit set.
fn raw_row() -> BoxGraph {
    let row = |i: i32, overlap_index: u16| RawBox {
        x_min: i * 2048,
        x_max: (i + 1) * 2048,
        z_min: 0,
        z_max: 2048,
        floor: 0,
        overlap_index,
    };
    let boxes = [row(0, 0), row(1, 0x4000 | 1), row(2, 3)];
    let words = [0x8000 | 1, 0, 0x8000 | 2, 0x8000 | 1];
    let zones = vec![ZoneId(0); 3];
    let set = ZoneSet {
        quarter_step: zones.clone(),
        half_step: zones.clone(),
        fly: zones,
    };
    let tables = ZoneTables {
        base: set.clone(),
        alternate: set,
    };
    BoxGraph::from_raw(&boxes, &words, tables).unwrap()
}

#[test]
fn raw_level_decodes_runs_and_flags() {
    let graph = raw_row();
    assert_eq!(graph.box_count(), 3);
    assert_eq!(graph.neighbors(BoxId(0)), &[BoxId(1)]);
    assert_eq!(graph.neighbors(BoxId(1)), &[BoxId(0), BoxId(2)]);
    assert_eq!(graph.neighbors(BoxId(2)), &[BoxId(1)]);
    assert_eq!(graph.nav_box(BoxId(1)).flags, BoxFlags::BLOCKED);
    assert!(graph.nav_box(BoxId(0)).flags.is_empty());
}

#[test]
fn blocked_box_tombstones_what_lies_behind_it() {
    let graph = raw_row();
    let mut rng = GameRng::new(9);
    let mut lot = LotInfo::new(&graph, &MovementProfile::walker(), 0);
    lot.set_random_search_target(&graph, BoxId(2), &mut rng);
    lot.update_path(&graph, FlipState::Base, 10);

    assert!(lot.is_search_exhausted());
    assert_eq!(lot.target_box, Some(BoxId(2)));
    assert!(lot.is_tombstoned_now(BoxId(1)));
    assert!(lot.is_tombstoned_now(BoxId(0)));
    assert_eq!(lot.exit_box(BoxId(0)), None);

    // Flyers share the block mask; the graph flag is what matters.
    let mut bat = LotInfo::new(&graph, &MovementProfile::flyer(16), 384);
    bat.set_random_search_target(&graph, BoxId(2), &mut rng);
    bat.update_path(&graph, FlipState::Base, 10);
    assert!(bat.is_tombstoned_now(BoxId(0)));
}

#[test]
fn raw_level_rejects_dangling_overlaps() {
    let boxes = [RawBox {
        x_min: 0,
        x_max: 1024,
        z_min: 0,
        z_max: 1024,
        floor: 0,
        overlap_index: 0,
    }];
    let err = BoxGraph::from_raw(&boxes, &[0x8000 | 4], ZoneTables::default()).unwrap_err();
    assert!(matches!(err, AiError::BoxOutOfRange { index: 4, count: 1 }));
}
