// Error type for the creature AI core.
//
// Only configuration and programming faults are errors. A creature standing
// outside every box is an ordinary tick with no new guidance, and angle or
// distance clamping is ordinary control flow; neither goes through here.
//
// See also: `config.rs` for species lookups, `mood.rs` for the `Mood`
// enumerator conversion, `nav.rs` for raw level decoding.

use crate::types::{CreatureId, SpeciesId};

/// Faults surfaced to the caller of the AI core.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// The species table has no entry for this id. Never defaulted: a made-up
    /// species would behave subtly wrong instead of failing.
    #[error("no species configuration for {0}")]
    MissingSpecies(SpeciesId),

    /// A mood value outside Bored/Stalk/Attack/Escape.
    #[error("mood enumerator {0} is out of range")]
    InvalidMood(u8),

    /// Raw level data references a box the arena doesn't have.
    #[error("box index {index} out of range (level has {count} boxes)")]
    BoxOutOfRange { index: usize, count: usize },

    /// A command named a creature the sim doesn't know.
    #[error("unknown {0}")]
    UnknownCreature(CreatureId),

    /// `GameConfig` JSON failed to parse.
    #[error("invalid game config: {0}")]
    Config(#[source] serde_json::Error),

    /// Saved state JSON failed to parse or serialize.
    #[error("invalid saved state: {0}")]
    State(#[source] serde_json::Error),
}
