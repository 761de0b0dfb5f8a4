use mudsim_bus::BusError;
use mudsim_core::{CharacterId, RoomId};
use thiserror::Error;

/// Failures of world-level commands (attach, detach, move).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// No room with this id exists.
    #[error("unknown room {0}")]
    UnknownRoom(RoomId),
    /// No character with this id is in the world.
    #[error("unknown character {0}")]
    UnknownCharacter(CharacterId),
    /// The character is already online.
    #[error("character {0} is already attached")]
    AlreadyAttached(CharacterId),
    /// The command only applies to player characters.
    #[error("character {0} is not a player")]
    NotAPlayer(CharacterId),
    /// Two rooms share an id.
    #[error("room {0} is defined twice")]
    DuplicateRoom(RoomId),
    /// The message bus refused a subscription.
    #[error(transparent)]
    Bus(#[from] BusError),
}
