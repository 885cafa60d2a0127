// tombkeeper_sim: creature navigation and behavior core.
//
// This crate decides, once per tick, where each hostile creature wants to
// go and how it gets there: a box-graph path search per creature, a
// perception snapshot of the enemy, a four-state mood machine that picks
// goals, and movement reconciliation that turns desired motion into a legal
// position. It knows nothing about rendering, animation playback or combat
// resolution; the level supplies the box graph and sector data and the
// game applies the results.
//
// Module overview:
// - `sim.rs`:        SimState, the per-tick pipeline, save/load.
// - `creature.rs`:   CreatureInfo (per-creature AI state) + steering helpers.
// - `lot.rs`:        LotInfo: incremental breadth-first search + target clamp.
// - `perception.rs`: AiInfo perception snapshot and the Enemy record.
// - `mood.rs`:       Mood FSM, goal selection, stalk/escape heuristics.
// - `movement.rs`:   Movement reconciliation (sector legality, corner probes).
// - `nav.rs`:        BoxGraph arena, zone tables, level decoding and builder.
// - `sector.rs`:     SectorQuery trait + dense SectorGrid.
// - `species.rs`:    SpeciesData + MovementProfile presets.
// - `config.rs`:     GameConfig + AiTuning.
// - `error.rs`:      AiError.
// - `prng`:          Re-exported from `tombkeeper_prng`: xoshiro256++ with
//                    SplitMix64 seeding.
// - `types.rs`:      WorldPos, Angle, ids, flip state, locomotion class.
//
// **Critical constraint: determinism.** Every tick is a pure function of
// the state, the level data and the seeded PRNG. No `HashMap`, no system
// time, no OS entropy. Use `BTreeMap` for ordered collections.

pub mod config;
pub mod creature;
pub mod error;
pub mod lot;
pub mod mood;
pub mod movement;
pub mod nav;
pub mod perception;
pub use tombkeeper_prng as prng;
pub mod sector;
pub mod sim;
pub mod species;
pub mod types;
