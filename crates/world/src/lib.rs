#![warn(missing_docs)]
//! World simulation: characters, spawners, rooms, areas and the world tick.
//!
//! [`World::on_tick`] updates every [`Area`], which updates every [`Room`] in
//! id order. A room runs its combat pass, then its occupants, then its
//! spawners. Rooms narrate through a [`MessageBus`](mudsim_bus::MessageBus)
//! topic per room; players receive that stream through their [`Session`].

mod area;
mod behavior;
mod character;
mod error;
mod persist;
mod record;
mod room;
mod spawner;
mod world;

pub use area::Area;
pub use behavior::{Aggressive, Behavior, Chatty, Passive};
pub use character::{
    Character, CharacterAction, Controller, Occupant, Session, TickContext, Tickable, REGEN_PERCENT,
    XP_PER_LEVEL,
};
pub use error::WorldError;
pub use persist::{FileStore, MemoryStore, StoreError, WorldStore};
pub use record::{
    AreaRecord, BehaviorSpec, CharacterRecord, NpcTemplate, RoomRecord, SpawnerRecord, Vitals,
    WorldMeta, WorldSnapshot,
};
pub use room::{Room, RoomChannel, RoomMessage};
pub use spawner::Spawner;
pub use world::{TickReport, World, WorldEvent, WorldSettings};
