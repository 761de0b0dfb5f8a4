//! Messages delivered to characters.

use serde::{Deserialize, Serialize};

/// Category of a message, used by clients for colouring and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Attack narration.
    Combat,
    /// Somebody died.
    Death,
    /// Arrivals, departures, ambient room text.
    Room,
    /// Speech.
    Say,
    /// Server notices.
    System,
}

/// A message addressed to one character or broadcast to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMessage {
    /// Message category.
    pub kind: MessageKind,
    /// Rendered text.
    pub text: String,
}

impl GameMessage {
    /// Build a message of any kind.
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Combat narration.
    pub fn combat(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Combat, text)
    }

    /// Death announcement.
    pub fn death(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Death, text)
    }

    /// Room text.
    pub fn room(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Room, text)
    }

    /// Speech.
    pub fn say(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Say, text)
    }

    /// Server notice.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageKind::System, text)
    }
}
