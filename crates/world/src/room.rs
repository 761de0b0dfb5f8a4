//! Rooms: occupants, combat and spawners on one bus topic.

use crate::character::{Character, CharacterAction, Occupant, TickContext, Tickable};
use crate::record::RoomRecord;
use crate::spawner::Spawner;
use crate::world::WorldEvent;
use mudsim_bus::{MessageBus, Topic};
use mudsim_combat::{Combat, CombatManager, Combatant, Fatality, RoomObserver};
use mudsim_core::{CharacterId, GameMessage, IdAllocator, RoomId, SimTick, SpawnerId};
use tracing::{debug, warn};

/// A message published on a room topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMessage {
    /// Characters that should not see it, usually because they got their own version.
    pub exclude: Vec<CharacterId>,
    /// The message.
    pub message: GameMessage,
}

impl RoomMessage {
    /// Whether `character` should receive this message.
    pub fn is_for(&self, character: CharacterId) -> bool {
        !self.exclude.contains(&character)
    }
}

/// Publishes onlooker messages to the room's bus topic.
#[derive(Debug, Clone)]
pub struct RoomChannel {
    topic: Topic,
    bus: MessageBus<RoomMessage>,
}

impl RoomChannel {
    /// Channel for `room` on `bus`.
    pub fn new(room: RoomId, bus: MessageBus<RoomMessage>) -> Self {
        Self {
            topic: Topic::room(room),
            bus,
        }
    }

    /// Topic the room publishes on.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl RoomObserver for RoomChannel {
    fn send_immediate(&self, exclude: &[CharacterId], message: GameMessage) {
        self.bus.publish(
            &self.topic,
            RoomMessage {
                exclude: exclude.to_vec(),
                message,
            },
        );
    }
}

/// One location in the world.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    name: String,
    description: String,
    occupants: Vec<Character>,
    combat: CombatManager,
    spawners: Vec<Spawner>,
    channel: RoomChannel,
}

impl Room {
    /// Empty room publishing on `bus`; a seed makes its combat reproducible.
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        description: impl Into<String>,
        bus: MessageBus<RoomMessage>,
        seed: Option<u64>,
    ) -> Self {
        let combat = match seed {
            Some(seed) => CombatManager::seeded(seed ^ id.0.wrapping_mul(0x0100_0000_01B3)),
            None => CombatManager::new(),
        };
        Self {
            id,
            name: name.into(),
            description: description.into(),
            occupants: Vec::new(),
            combat,
            spawners: Vec::new(),
            channel: RoomChannel::new(id, bus),
        }
    }

    /// Rebuild from a saved record.
    pub fn from_record(record: &RoomRecord, bus: MessageBus<RoomMessage>, seed: Option<u64>) -> Self {
        let mut room = Self::new(record.id, record.name.clone(), record.description.clone(), bus, seed);
        room.spawners = record.spawners.iter().map(Spawner::from_record).collect();
        room
    }

    /// Save form. Occupants are not part of it.
    pub fn to_record(&self) -> RoomRecord {
        RoomRecord {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            spawners: self.spawners.iter().map(Spawner::to_record).collect(),
        }
    }

    /// Stable id.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Short title.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Long description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Bus topic for this room.
    pub fn topic(&self) -> &Topic {
        self.channel.topic()
    }

    /// Everyone present, in arrival order.
    pub fn occupants(&self) -> &[Character] {
        &self.occupants
    }

    /// One occupant.
    pub fn occupant(&self, id: CharacterId) -> Option<&Character> {
        self.occupants.iter().find(|character| character.id() == id)
    }

    /// One occupant, mutably.
    pub fn occupant_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.occupants.iter_mut().find(|character| character.id() == id)
    }

    /// Whether `id` is here.
    pub fn contains(&self, id: CharacterId) -> bool {
        self.occupant(id).is_some()
    }

    /// Spawners placed here.
    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    /// Place a spawner.
    pub fn add_spawner(&mut self, spawner: Spawner) {
        self.spawners.push(spawner);
    }

    /// Active combats.
    pub fn combat_manager(&self) -> &CombatManager {
        &self.combat
    }

    /// Active combats, mutably.
    pub fn combat_manager_mut(&mut self) -> &mut CombatManager {
        &mut self.combat
    }

    /// Publish to everyone here except `exclude`.
    pub fn broadcast(&self, exclude: &[CharacterId], message: GameMessage) {
        self.channel.send_immediate(exclude, message);
    }

    /// Bring a character in. No announcement.
    pub fn add_character(&mut self, character: Character) {
        self.occupants.push(character);
    }

    /// Take a character out, ending every combat it is part of.
    pub fn remove_character(&mut self, id: CharacterId) -> Option<Character> {
        let index = self.occupants.iter().position(|character| character.id() == id)?;
        let ended = self.combat.end_combats_involving(id);
        if ended > 0 {
            debug!(room = %self.id, character = %id, ended, "combats ended on departure");
        }
        let character = self.occupants.remove(index);
        if let Some(spawner) = character.spawner() {
            self.release_from_spawner(spawner, id);
        }
        Some(character)
    }

    /// Advance one tick: combat, then characters, then spawners.
    ///
    /// Characters spawned this tick join the room last, so they see neither
    /// a combat pass nor regeneration until the next tick.
    pub fn on_tick(&mut self, tick: SimTick, ids: &IdAllocator) -> Vec<WorldEvent> {
        let mut events = Vec::new();

        if !self.combat.is_empty() {
            let report = self.combat.process_round(&mut self.occupants, &self.channel);
            for fatality in report.fatalities {
                self.handle_death(fatality, &mut events);
            }
        }

        let views: Vec<Occupant> = self
            .occupants
            .iter()
            .map(|character| character.occupant_view(self.combat.combat(character.id()).map(Combat::defender)))
            .collect();
        let ctx = TickContext {
            tick,
            room: self.id,
            occupants: &views,
        };
        let mut actions = Vec::new();
        for character in &mut self.occupants {
            actions.extend(character.on_tick(&ctx));
        }
        for action in actions {
            self.perform(action);
        }

        let mut spawned = Vec::new();
        for spawner in &mut self.spawners {
            spawned.extend(spawner.on_tick(ids));
        }
        for npc in spawned {
            self.broadcast(&[], GameMessage::room(format!("{} appears.", npc.name())));
            events.push(WorldEvent::Spawned {
                npc: npc.id(),
                room: self.id,
            });
            self.occupants.push(npc);
        }

        events
    }

    /// Carry out an action for someone in this room.
    ///
    /// Returns false when the action no longer makes sense (actor gone or
    /// dead, target missing, already fighting).
    pub fn perform(&mut self, action: CharacterAction) -> bool {
        match action {
            CharacterAction::Attack { attacker, target } => self.start_fight(attacker, target),
            CharacterAction::Say { speaker, text } => {
                let Some(character) = self.occupant(speaker).filter(|c| c.is_alive()) else {
                    return false;
                };
                character.send_immediate(GameMessage::say(format!("You say, \"{text}\"")));
                self.broadcast(
                    &[speaker],
                    GameMessage::say(format!("{} says, \"{}\"", character.name(), text)),
                );
                true
            }
        }
    }

    fn start_fight(&mut self, attacker: CharacterId, target: CharacterId) -> bool {
        let (Some(a), Some(t)) = (self.occupant(attacker), self.occupant(target)) else {
            warn!(room = %self.id, %attacker, %target, "attack between characters not in room");
            return false;
        };
        if !a.is_alive() || !t.is_alive() || attacker == target {
            return false;
        }
        let (attacker_name, target_name) = (a.name().to_string(), t.name().to_string());

        if !self.combat.engage_mutual(attacker, target) {
            return false;
        }

        if let Some(a) = self.occupant(attacker) {
            a.send_immediate(GameMessage::combat(format!("You attack {target_name}!")));
        }
        if let Some(t) = self.occupant(target) {
            t.send_immediate(GameMessage::combat(format!("{attacker_name} attacks you!")));
        }
        self.broadcast(
            &[attacker, target],
            GameMessage::combat(format!("{attacker_name} attacks {target_name}!")),
        );
        true
    }

    fn handle_death(&mut self, fatality: Fatality, events: &mut Vec<WorldEvent>) {
        let Fatality { victim, killer } = fatality;
        let Some(character) = self.occupant(victim) else {
            warn!(room = %self.id, %victim, "fatality for a character not in room");
            return;
        };

        if character.is_player() {
            events.push(WorldEvent::PlayerDied {
                player: victim,
                room: self.id,
                killer,
            });
            return;
        }

        self.remove_character(victim);
        events.push(WorldEvent::NpcDied {
            npc: victim,
            room: self.id,
            killer,
        });
    }

    fn release_from_spawner(&mut self, spawner: SpawnerId, id: CharacterId) {
        match self.spawners.iter_mut().find(|candidate| candidate.id() == spawner) {
            Some(owner) => {
                owner.release(id);
            }
            None => warn!(room = %self.id, %spawner, character = %id, "spawner not found in room"),
        }
    }
}
