//! Areas group rooms and update them in id order.

use crate::error::WorldError;
use crate::record::AreaRecord;
use crate::room::{Room, RoomMessage};
use crate::world::WorldEvent;
use mudsim_bus::MessageBus;
use mudsim_core::{AreaId, IdAllocator, RoomId, SimTick};
use std::collections::BTreeMap;

/// A named collection of rooms.
#[derive(Debug)]
pub struct Area {
    id: AreaId,
    name: String,
    rooms: BTreeMap<RoomId, Room>,
}

impl Area {
    /// Area with no rooms.
    pub fn new(id: AreaId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            rooms: BTreeMap::new(),
        }
    }

    /// Rebuild from a saved record.
    pub fn from_record(
        record: &AreaRecord,
        bus: &MessageBus<RoomMessage>,
        seed: Option<u64>,
    ) -> Result<Self, WorldError> {
        let mut area = Self::new(record.id, record.name.clone());
        for room in &record.rooms {
            area.add_room(Room::from_record(room, bus.clone(), seed))?;
        }
        Ok(area)
    }

    /// Save form.
    pub fn to_record(&self) -> AreaRecord {
        AreaRecord {
            id: self.id,
            name: self.name.clone(),
            rooms: self.rooms.values().map(Room::to_record).collect(),
        }
    }

    /// Stable id.
    pub fn id(&self) -> AreaId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a room; ids must be unique within the area.
    pub fn add_room(&mut self, room: Room) -> Result<(), WorldError> {
        if self.rooms.contains_key(&room.id()) {
            return Err(WorldError::DuplicateRoom(room.id()));
        }
        self.rooms.insert(room.id(), room);
        Ok(())
    }

    /// Rooms in id order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// One room.
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// One room, mutably.
    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    /// Update every room, one after another.
    pub fn on_tick(&mut self, tick: SimTick, ids: &IdAllocator) -> Vec<WorldEvent> {
        self.rooms
            .values_mut()
            .flat_map(|room| room.on_tick(tick, ids))
            .collect()
    }
}
