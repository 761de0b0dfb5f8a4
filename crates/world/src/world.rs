//! The world: every area, the clock, and player sessions.

use crate::area::Area;
use crate::character::{Character, CharacterAction, Session};
use crate::error::WorldError;
use crate::record::{CharacterRecord, WorldMeta, WorldSnapshot};
use crate::room::{Room, RoomMessage};
use mudsim_bus::{MessageBus, SubscriptionHandle, Topic};
use mudsim_combat::Combatant;
use mudsim_core::{AreaId, CharacterId, GameMessage, IdAllocator, RoomId, SimTick};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, trace, warn};

/// Something that happened during a tick that the owner may care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// A player dropped to zero hit points.
    PlayerDied {
        /// Who died.
        player: CharacterId,
        /// Where.
        room: RoomId,
        /// Who landed the blow.
        killer: Option<CharacterId>,
    },
    /// A non-player character died and was removed.
    NpcDied {
        /// Who died.
        npc: CharacterId,
        /// Where.
        room: RoomId,
        /// Who landed the blow.
        killer: Option<CharacterId>,
    },
    /// A spawner produced a character.
    Spawned {
        /// The new character.
        npc: CharacterId,
        /// Where.
        room: RoomId,
    },
    /// A dead player was restored.
    Respawned {
        /// Who.
        player: CharacterId,
        /// Where they woke up.
        room: RoomId,
    },
}

/// World-level knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSettings {
    /// A snapshot is taken on every tick divisible by this; 0 disables saving.
    pub save_every_ticks: u64,
    /// Where players without a saved room appear.
    pub start_room: RoomId,
    /// Where dead players wake up.
    pub respawn_room: RoomId,
    /// Seed for reproducible combat.
    pub seed: Option<u64>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            save_every_ticks: 20,
            start_room: RoomId(1),
            respawn_room: RoomId(1),
            seed: None,
        }
    }
}

/// Result of one [`World::on_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Tick just completed.
    pub tick: SimTick,
    /// Events in the order they happened.
    pub events: Vec<WorldEvent>,
    /// State to persist, on save ticks.
    pub snapshot: Option<WorldSnapshot>,
}

/// All areas plus the player session bookkeeping.
///
/// The world has no clock of its own: `mudsim_server::Server` owns the tick
/// timer, calls [`World::on_tick`] under its lock and stops it in
/// `Server::shutdown`.
#[derive(Debug)]
pub struct World {
    settings: WorldSettings,
    bus: MessageBus<RoomMessage>,
    areas: BTreeMap<AreaId, Area>,
    room_index: BTreeMap<RoomId, AreaId>,
    ids: IdAllocator,
    tick: SimTick,
    subscriptions: BTreeMap<CharacterId, SubscriptionHandle>,
}

impl World {
    /// Empty world at tick zero.
    pub fn new(settings: WorldSettings, bus: MessageBus<RoomMessage>) -> Self {
        Self {
            settings,
            bus,
            areas: BTreeMap::new(),
            room_index: BTreeMap::new(),
            ids: IdAllocator::default(),
            tick: SimTick::ZERO,
            subscriptions: BTreeMap::new(),
        }
    }

    /// Rebuild from a snapshot. Players listed in it are not brought online;
    /// they come back through [`attach`](Self::attach).
    pub fn from_snapshot(
        settings: WorldSettings,
        bus: MessageBus<RoomMessage>,
        snapshot: &WorldSnapshot,
    ) -> Result<Self, WorldError> {
        let mut world = Self::new(settings, bus);
        world.tick = snapshot.meta.tick;
        world.ids = IdAllocator::starting_at(snapshot.meta.next_character_id);
        for record in &snapshot.areas {
            let area = Area::from_record(record, &world.bus, settings.seed)?;
            world.add_area(area)?;
        }
        for character in &snapshot.characters {
            world.ids.observe(character.id);
        }
        info!(
            tick = world.tick.0,
            areas = world.areas.len(),
            rooms = world.room_index.len(),
            "world restored"
        );
        Ok(world)
    }

    /// Add an area; room ids must be unique across the world.
    pub fn add_area(&mut self, area: Area) -> Result<(), WorldError> {
        if let Some(clash) = area.rooms().map(Room::id).find(|id| self.room_index.contains_key(id)) {
            return Err(WorldError::DuplicateRoom(clash));
        }
        for room in area.rooms() {
            self.room_index.insert(room.id(), area.id());
        }
        self.areas.insert(area.id(), area);
        Ok(())
    }

    /// Settings in force.
    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Bus the rooms publish on.
    pub fn bus(&self) -> &MessageBus<RoomMessage> {
        &self.bus
    }

    /// Character id allocator.
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Last completed tick.
    pub fn tick(&self) -> SimTick {
        self.tick
    }

    /// Areas in id order.
    pub fn areas(&self) -> impl Iterator<Item = &Area> {
        self.areas.values()
    }

    /// One room.
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        let area = self.room_index.get(&id)?;
        self.areas.get(area)?.room(id)
    }

    /// One room, mutably.
    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        let area = self.room_index.get(&id)?;
        self.areas.get_mut(area)?.room_mut(id)
    }

    /// Room a character is in.
    pub fn locate(&self, id: CharacterId) -> Option<RoomId> {
        self.areas
            .values()
            .flat_map(Area::rooms)
            .find(|room| room.contains(id))
            .map(Room::id)
    }

    /// A character anywhere in the world.
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.room(self.locate(id)?)?.occupant(id)
    }

    /// Number of attached players.
    pub fn players_online(&self) -> usize {
        self.subscriptions.len()
    }

    /// Ids of attached players, ascending.
    pub fn online_players(&self) -> Vec<CharacterId> {
        self.subscriptions.keys().copied().collect()
    }

    /// Advance one tick: every area in id order, then respawns, then the
    /// snapshot if this is a save tick.
    pub fn on_tick(&mut self) -> TickReport {
        self.tick = self.tick.advance(1);
        let tick = self.tick;

        let mut events = Vec::new();
        for area in self.areas.values_mut() {
            events.extend(area.on_tick(tick, &self.ids));
        }

        let deaths: Vec<(CharacterId, RoomId)> = events
            .iter()
            .filter_map(|event| match *event {
                WorldEvent::PlayerDied { player, room, .. } => Some((player, room)),
                _ => None,
            })
            .collect();
        for (player, room) in deaths {
            if let Some(woke_in) = self.respawn(player, room) {
                events.push(WorldEvent::Respawned {
                    player,
                    room: woke_in,
                });
            }
        }

        let snapshot = tick
            .is_multiple_of(self.settings.save_every_ticks)
            .then(|| self.snapshot());

        debug!(tick = tick.0, events = events.len(), save = snapshot.is_some(), "world tick");
        TickReport {
            tick,
            events,
            snapshot,
        }
    }

    /// Bring a player online and subscribe its session to its room.
    ///
    /// The saved room is used when it still exists, otherwise the start room.
    pub fn attach(&mut self, record: CharacterRecord, session: Session) -> Result<RoomId, WorldError> {
        let id = record.id;
        if self.subscriptions.contains_key(&id) || self.locate(id).is_some() {
            return Err(WorldError::AlreadyAttached(id));
        }
        let room_id = record
            .room
            .filter(|room| self.room_index.contains_key(room))
            .unwrap_or(self.settings.start_room);
        if !self.room_index.contains_key(&room_id) {
            return Err(WorldError::UnknownRoom(room_id));
        }

        self.ids.observe(id);
        self.subscribe(id, room_id, session.clone())?;
        let character = Character::player(record, session);
        self.arrive(room_id, character);
        info!(character = %id, room = %room_id, "player attached");
        Ok(room_id)
    }

    /// Take a player offline; returns its record for saving.
    pub fn detach(&mut self, id: CharacterId) -> Result<CharacterRecord, WorldError> {
        let room_id = self.locate(id).ok_or(WorldError::UnknownCharacter(id))?;
        if !self.character(id).is_some_and(Character::is_player) {
            return Err(WorldError::NotAPlayer(id));
        }

        let character = self.depart(room_id, id)?;
        if let Some(handle) = self.subscriptions.remove(&id) {
            self.bus.unsubscribe(&handle);
        }
        info!(character = %id, room = %room_id, "player detached");
        Ok(character.to_record(Some(room_id)))
    }

    /// Move a character between rooms, ending its combats in the old one.
    pub fn move_character(&mut self, id: CharacterId, to: RoomId) -> Result<(), WorldError> {
        if !self.room_index.contains_key(&to) {
            return Err(WorldError::UnknownRoom(to));
        }
        let from = self.locate(id).ok_or(WorldError::UnknownCharacter(id))?;
        if from == to {
            return Ok(());
        }

        let character = self.depart(from, id)?;
        let session = character.session().cloned();
        self.arrive(to, character);
        if let Some(session) = session {
            self.subscribe(id, to, session)?;
        }
        debug!(character = %id, %from, %to, "character moved");
        Ok(())
    }

    /// Carry out an action on behalf of a character, e.g. a player command.
    pub fn perform(&mut self, action: CharacterAction) -> Result<bool, WorldError> {
        let actor = match &action {
            CharacterAction::Attack { attacker, .. } => *attacker,
            CharacterAction::Say { speaker, .. } => *speaker,
        };
        let room_id = self.locate(actor).ok_or(WorldError::UnknownCharacter(actor))?;
        let room = self.room_mut(room_id).ok_or(WorldError::UnknownRoom(room_id))?;
        Ok(room.perform(action))
    }

    /// Everything a save point writes.
    pub fn snapshot(&self) -> WorldSnapshot {
        let characters = self
            .areas
            .values()
            .flat_map(Area::rooms)
            .flat_map(|room| {
                room.occupants()
                    .iter()
                    .filter(|character| character.is_player())
                    .map(move |character| character.to_record(Some(room.id())))
            })
            .collect();

        WorldSnapshot {
            meta: WorldMeta {
                tick: self.tick,
                next_character_id: self.ids.peek(),
            },
            areas: self.areas.values().map(Area::to_record).collect(),
            characters,
        }
    }

    fn respawn(&mut self, player: CharacterId, died_in: RoomId) -> Option<RoomId> {
        let target = if self.room_index.contains_key(&self.settings.respawn_room) {
            self.settings.respawn_room
        } else {
            warn!(room = %self.settings.respawn_room, "respawn room missing; reviving in place");
            died_in
        };

        if target != died_in {
            if let Err(error) = self.move_character(player, target) {
                warn!(character = %player, %error, "respawn move failed");
                return None;
            }
        }

        let room = self.room_mut(target)?;
        let name = room.name().to_string();
        let character = room.occupant_mut(player)?;
        character.restore_vitals();
        character.send_immediate(GameMessage::system(format!("You awaken in {name}.")));
        info!(character = %player, room = %target, "player respawned");
        Some(target)
    }

    fn arrive(&mut self, room_id: RoomId, character: Character) {
        let Some(room) = self.room_mut(room_id) else {
            warn!(room = %room_id, character = %character.id(), "arrival in unknown room");
            return;
        };
        let id = character.id();
        character.send_immediate(GameMessage::room(format!("{}\n{}", room.name(), room.description())));
        room.broadcast(&[id], GameMessage::room(format!("{} arrives.", character.name())));
        room.add_character(character);
    }

    fn depart(&mut self, room_id: RoomId, id: CharacterId) -> Result<Character, WorldError> {
        let room = self.room_mut(room_id).ok_or(WorldError::UnknownRoom(room_id))?;
        let character = room
            .remove_character(id)
            .ok_or(WorldError::UnknownCharacter(id))?;
        room.broadcast(&[id], GameMessage::room(format!("{} leaves.", character.name())));
        Ok(character)
    }

    fn subscribe(&mut self, id: CharacterId, room: RoomId, session: Session) -> Result<(), WorldError> {
        if let Some(previous) = self.subscriptions.remove(&id) {
            self.bus.unsubscribe(&previous);
        }
        let handle = self.bus.subscribe(Topic::room(room), move |message: &RoomMessage| {
            if message.is_for(id) && session.send(message.message.clone()).is_err() {
                trace!(character = %id, "session closed; room message dropped");
            }
        })?;
        self.subscriptions.insert(id, handle);
        Ok(())
    }
}
