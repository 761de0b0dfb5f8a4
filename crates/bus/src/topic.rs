//! Topic keys.

use mudsim_core::RoomId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key grouping bus subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Topic for an arbitrary key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Topic carrying everything said or done in a room.
    pub fn room(room: RoomId) -> Self {
        Self(room.to_string())
    }

    /// Key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<RoomId> for Topic {
    fn from(room: RoomId) -> Self {
        Topic::room(room)
    }
}

impl From<&str> for Topic {
    fn from(key: &str) -> Self {
        Topic::new(key)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
