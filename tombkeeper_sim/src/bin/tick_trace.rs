// Tick trace: run the creature AI headless on a demo level and print every
// creature's per-tick report as JSON lines.
//
// The demo level is a hall with a raised ledge to the east, a blockable
// doorway north into a second room, and a deep pit beside it that only
// flyers can use. The ledge joint is cut in the alternate room set.
//
// Usage:
//   tick_trace [OPTIONS]
//     --seed <N>        PRNG seed (default: the config's default_seed)
//     --ticks <N>       Ticks to run (default: 200)
//     --config <PATH>   GameConfig JSON (default: built-in table)
//     --flip-at <N>     Switch to the alternate room set at tick N
//     --close-door      Start with the doorway blocked
//
// Logging goes to stderr and honors `RUST_LOG` (e.g.
// `RUST_LOG=tombkeeper_sim=debug` shows mood changes and search re-roots).

use tombkeeper_sim::config::{APE, BAT, GameConfig, RAPTOR, WOLF};
use tombkeeper_sim::error::AiError;
use tombkeeper_sim::nav::{BoxFlags, BoxGraph, BoxGraphBuilder, BoxRect};
use tombkeeper_sim::perception::Enemy;
use tombkeeper_sim::sector::SectorGrid;
use tombkeeper_sim::sim::SimState;
use tombkeeper_sim::types::{Angle, BoxId, FlipState, RoomId, SECTOR_SIZE, STEP_SIZE, WorldPos};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Options {
    seed: Option<u64>,
    ticks: u64,
    config_path: Option<String>,
    flip_at: Option<u64>,
    close_door: bool,
}

fn main() {
    init_tracing();
    let options = parse_args();
    if let Err(e) = run(&options) {
        eprintln!("tick_trace failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Simple `std::env::args()` matching; unknown flags abort.
fn parse_args() -> Options {
    let mut options = Options {
        seed: None,
        ticks: 200,
        config_path: None,
        flip_at: None,
        close_door: false,
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                options.seed = Some(parse_number(&args, i, "--seed"));
            }
            "--ticks" => {
                i += 1;
                options.ticks = parse_number(&args, i, "--ticks");
            }
            "--config" => {
                i += 1;
                options.config_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a path");
                    std::process::exit(1);
                }));
            }
            "--flip-at" => {
                i += 1;
                options.flip_at = Some(parse_number(&args, i, "--flip-at"));
            }
            "--close-door" => options.close_door = true,
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    options
}

fn parse_number(args: &[String], i: usize, flag: &str) -> u64 {
    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{flag} requires a number");
        std::process::exit(1);
    })
}

/// The doorway box id in `demo_level()`.
const DOOR: BoxId = BoxId(2);

fn demo_level() -> BoxGraph {
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

fn run(options: &Options) -> Result<(), AiError> {
    let config = match &options.config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Failed to read {path}: {e}");
                std::process::exit(1);
            });
            GameConfig::from_json(&json)?
        }
        None => GameConfig::default(),
    };
    let seed = options.seed.unwrap_or(config.default_seed);

    let graph = demo_level();
    let sectors = SectorGrid::from_graph(&graph, 4 * SECTOR_SIZE, RoomId(0));
    let enemy = Enemy {
        box_id: None,
        pos: WorldPos::new(1500, 0, 7000),
        yaw: Angle::DEG_90,
        health: 1000,
        aim_height: 700,
    };
    let mut sim = SimState::new(config, graph, sectors, enemy, seed);
    sim.place_enemy(enemy.pos, enemy.yaw);
    if options.close_door {
        sim.set_box_blocked(DOOR, true)?;
    }

    sim.spawn_creature(WOLF, WorldPos::new(1000, 0, 1000), Angle::ZERO)?;
    sim.spawn_creature(RAPTOR, WorldPos::new(5000, 0, 2000), -Angle::DEG_90)?;
    sim.spawn_creature(BAT, WorldPos::new(8000, 300, 2000), Angle::DEG_180)?;
    sim.spawn_creature(APE, WorldPos::new(3000, 0, 6000), Angle::DEG_45)?;
    info!(seed, ticks = options.ticks, creatures = sim.creatures.len(), "tick_trace_start");

    for _ in 0..options.ticks {
        if options.flip_at == Some(sim.tick) {
            sim.set_flip(FlipState::Alternate);
        }
        let reports = sim.step()?;
        for report in &reports {
            let line = serde_json::json!({ "tick": sim.tick, "report": report });
            println!("{line}");
        }
    }

    info!(tick = sim.tick, "tick_trace_done");
    Ok(())
}
