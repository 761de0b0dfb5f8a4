#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod attack;
pub mod dice;
pub mod ids;
pub mod message;
pub mod stats;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use attack::{Attack, AttackVerbs, DamageType, HitLocation};
pub use dice::DiceBag;
pub use ids::{AreaId, CharacterId, IdAllocator, RoomId, SpawnerId};
pub use message::{GameMessage, MessageKind};
pub use stats::{Attribute, AttributeScores, SizeClass, Skill, Skills};

/// Monotonic world tick counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }

    /// True when this tick lands on a multiple of `every` (never for `every == 0`).
    pub fn is_multiple_of(self, every: u64) -> bool {
        every != 0 && self.0 % every == 0
    }
}

/// Build an RNG for one randomness domain.
///
/// With a world seed the stream is reproducible (seed mixed with `stream`);
/// without one it is drawn from OS entropy.
pub fn scoped_rng(world_seed: Option<u64>, stream: u64) -> StdRng {
    match world_seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => StdRng::from_entropy(),
    }
}
