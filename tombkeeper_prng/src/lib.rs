// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// Hand-rolled with zero external dependencies so output is identical on every
// platform.
//
// On top of the raw generator this crate exposes the 15-bit "control" draw
// the creature AI is tuned against: every chance in the AI tables is
// expressed as a threshold out of 32768 (`chance(2048)` is 1/16), and every
// uniform pick inside a box or a zone list scales a 15-bit draw with a shift.
// Keeping those draws in one place means a seeded `GameRng` reproduces a
// whole mood/target sequence tick for tick.
//
// **Critical constraint: determinism.** Every method on `GameRng` must produce
// identical output given the same prior state, regardless of platform, compiler
// version, or optimization level. Do not use floating-point arithmetic in the
// core generator, stdlib PRNG, or any source of non-determinism in this module.

use serde::{Deserialize, Serialize};

/// Exclusive upper bound of a control draw (2^15).
pub const CONTROL_RANGE: i32 = 1 << 15;

/// Xoshiro256++ PRNG, the simulation's sole source of randomness.
///
/// The sim state owns exactly one `GameRng` and lends it to each creature's
/// AI in turn, so creature order plus seed fully determines the stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two `GameRng` instances created with the same seed will produce
    /// identical output sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// A uniform draw in `[0, 32768)`, taken from the top 15 bits.
    pub fn next_control(&mut self) -> i32 {
        (self.next_u64() >> 49) as i32
    }

    /// `true` with probability `threshold / 32768`.
    ///
    /// Thresholds `<= 0` never fire; thresholds `>= 32768` always fire.
    pub fn chance(&mut self, threshold: i32) -> bool {
        self.next_control() < threshold
    }

    /// Scale a control draw onto `[0, span)` the way the AI tables expect:
    /// `(draw * span) >> 15`. A non-positive `span` yields 0.
    pub fn scaled(&mut self, span: i32) -> i32 {
        if span <= 0 {
            return 0;
        }
        ((i64::from(self.next_control()) * i64::from(span)) >> 15) as i32
    }
}

/// SplitMix64, used only for seeding xoshiro256++ from a single `u64`.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
