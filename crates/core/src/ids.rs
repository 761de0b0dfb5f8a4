//! Identity newtypes for world entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a player or non-player character.
    CharacterId,
    "char"
);
id_type!(
    /// Identity of a room; also the key of the room's bus topic.
    RoomId,
    "room"
);
id_type!(
    /// Identity of an area.
    AreaId,
    "area"
);
id_type!(
    /// Identity of a spawner within its room.
    SpawnerId,
    "spawner"
);

/// Hands out fresh character ids for spawned non-player characters.
///
/// Persisted characters keep their stored ids; the allocator is started above
/// the highest loaded id so the two ranges never collide.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.max(1)),
        }
    }

    /// Allocate the next character id.
    pub fn next_character(&self) -> CharacterId {
        CharacterId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The id the next allocation will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    /// Make sure future ids are strictly greater than `seen`.
    pub fn observe(&self, seen: CharacterId) {
        self.next.fetch_max(seen.0.saturating_add(1), Ordering::Relaxed);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}
