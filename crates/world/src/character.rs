//! Player and non-player characters.

use crate::behavior::Behavior;
use crate::record::{CharacterRecord, NpcTemplate, Vitals};
use mudsim_combat::{Combatant, DamageOutcome};
use mudsim_core::{
    Attack, Attribute, AttributeScores, CharacterId, GameMessage, HitLocation, RoomId, SimTick,
    SizeClass, Skill, Skills, SpawnerId,
};
use std::collections::BTreeMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

/// Outbound message channel of a connected player.
pub type Session = UnboundedSender<GameMessage>;

/// Experience awarded per level of a defeated foe.
pub const XP_PER_LEVEL: u64 = 100;

/// Percentage of each base pool regained per idle tick.
pub const REGEN_PERCENT: i32 = 5;

/// Something a character decided to do during its turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacterAction {
    /// Start a fight.
    Attack {
        /// Who swings first.
        attacker: CharacterId,
        /// Who gets swung at.
        target: CharacterId,
    },
    /// Speak to the room.
    Say {
        /// Who speaks.
        speaker: CharacterId,
        /// What they say.
        text: String,
    },
}

/// Read-only view of one room occupant, taken before the character phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    /// Character id.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Controlled by a connected player.
    pub is_player: bool,
    /// Above zero hit points.
    pub alive: bool,
    /// Who this occupant is attacking, if anyone.
    pub target: Option<CharacterId>,
}

/// What a character sees on its turn.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// Current world tick.
    pub tick: SimTick,
    /// Room being updated.
    pub room: RoomId,
    /// Everyone in the room, in arrival order.
    pub occupants: &'a [Occupant],
}

impl TickContext<'_> {
    /// Look up one occupant.
    pub fn occupant(&self, id: CharacterId) -> Option<&Occupant> {
        self.occupants.iter().find(|occupant| occupant.id == id)
    }

    /// Who `id` is attacking.
    pub fn target_of(&self, id: CharacterId) -> Option<CharacterId> {
        self.occupant(id).and_then(|occupant| occupant.target)
    }

    /// Whether `id` is attacking or being attacked.
    pub fn is_engaged(&self, id: CharacterId) -> bool {
        self.occupants
            .iter()
            .any(|occupant| occupant.target == Some(id) || (occupant.id == id && occupant.target.is_some()))
    }
}

/// Per-tick update hook shared by every kind of character.
pub trait Tickable {
    /// Advance one tick; returns the actions the room should apply.
    fn on_tick(&mut self, ctx: &TickContext<'_>) -> Vec<CharacterAction>;
}

/// Who drives a character.
#[derive(Debug)]
pub enum Controller {
    /// A connected player.
    Player {
        /// Where direct messages go.
        session: Session,
    },
    /// Server-side AI.
    NonPlayer {
        /// Decision strategy.
        behavior: Box<dyn Behavior>,
        /// Spawner that owns this character, if any.
        spawner: Option<SpawnerId>,
    },
}

/// A living thing in a room.
#[derive(Debug)]
pub struct Character {
    id: CharacterId,
    name: String,
    level: u32,
    experience: u64,
    kills: u32,
    size: SizeClass,
    attributes: AttributeScores,
    skills: Skills,
    attacks: Vec<Attack>,
    armor: BTreeMap<HitLocation, i32>,
    hit_points: Vitals,
    mana: Vitals,
    energy: Vitals,
    controller: Controller,
}

impl Character {
    /// Bring a saved player online.
    pub fn player(record: CharacterRecord, session: Session) -> Self {
        Self {
            id: record.id,
            name: record.name,
            level: record.level,
            experience: record.experience,
            kills: record.kills,
            size: record.size,
            attributes: record.attributes,
            skills: record.skills,
            attacks: record.attacks,
            armor: record.armor,
            hit_points: record.hit_points,
            mana: record.mana,
            energy: record.energy,
            controller: Controller::Player { session },
        }
    }

    /// Stamp a non-player character out of a template.
    pub fn from_template(id: CharacterId, template: &NpcTemplate, spawner: Option<SpawnerId>) -> Self {
        Self {
            id,
            name: template.name.clone(),
            level: template.level,
            experience: 0,
            kills: 0,
            size: template.size,
            attributes: template.attributes,
            skills: template.skills.clone(),
            attacks: template.attacks.clone(),
            armor: template.armor.clone(),
            hit_points: Vitals::full(template.hit_points.max(1)),
            mana: Vitals::full(template.mana.max(0)),
            energy: Vitals::full(template.energy.max(0)),
            controller: Controller::NonPlayer {
                behavior: template.behavior.build(),
                spawner,
            },
        }
    }

    /// Save form; `room` is where the character currently stands.
    pub fn to_record(&self, room: Option<RoomId>) -> CharacterRecord {
        CharacterRecord {
            id: self.id,
            name: self.name.clone(),
            level: self.level,
            experience: self.experience,
            kills: self.kills,
            size: self.size,
            attributes: self.attributes,
            skills: self.skills.clone(),
            attacks: self.attacks.clone(),
            armor: self.armor.clone(),
            hit_points: self.hit_points,
            mana: self.mana,
            energy: self.energy,
            room,
        }
    }

    /// Controlled by a connected player.
    pub fn is_player(&self) -> bool {
        matches!(self.controller, Controller::Player { .. })
    }

    /// Above zero hit points.
    pub fn is_alive(&self) -> bool {
        self.hit_points.current > 0
    }

    /// Spawner that owns this character.
    pub fn spawner(&self) -> Option<SpawnerId> {
        match &self.controller {
            Controller::NonPlayer { spawner, .. } => *spawner,
            Controller::Player { .. } => None,
        }
    }

    /// Player session, if any.
    pub fn session(&self) -> Option<&Session> {
        match &self.controller {
            Controller::Player { session } => Some(session),
            Controller::NonPlayer { .. } => None,
        }
    }

    /// Hit points.
    pub fn hit_point_pool(&self) -> Vitals {
        self.hit_points
    }

    /// Mana.
    pub fn mana(&self) -> Vitals {
        self.mana
    }

    /// Energy.
    pub fn energy(&self) -> Vitals {
        self.energy
    }

    /// Experience points.
    pub fn experience(&self) -> u64 {
        self.experience
    }

    /// Lifetime kills.
    pub fn kills(&self) -> u32 {
        self.kills
    }

    /// Set current hit points, clamped to `0..=base`.
    pub fn set_hit_points(&mut self, value: i32) {
        self.hit_points.current = value.clamp(0, self.hit_points.base);
    }

    /// Refill every pool.
    pub fn restore_vitals(&mut self) {
        self.hit_points.refill();
        self.mana.refill();
        self.energy.refill();
    }

    fn regenerate(&mut self) {
        for pool in [&mut self.hit_points, &mut self.mana, &mut self.energy] {
            if pool.is_depleted() {
                pool.restore((pool.base * REGEN_PERCENT / 100).max(1));
            }
        }
    }

    /// Snapshot used by other characters' decisions.
    pub fn occupant_view(&self, target: Option<CharacterId>) -> Occupant {
        Occupant {
            id: self.id,
            name: self.name.clone(),
            is_player: self.is_player(),
            alive: self.is_alive(),
            target,
        }
    }
}

impl Tickable for Character {
    fn on_tick(&mut self, ctx: &TickContext<'_>) -> Vec<CharacterAction> {
        if !self.is_alive() {
            return Vec::new();
        }
        if !ctx.is_engaged(self.id) {
            self.regenerate();
        }

        match &mut self.controller {
            Controller::Player { .. } => Vec::new(),
            Controller::NonPlayer { behavior, .. } => behavior.decide(self.id, ctx),
        }
    }
}

impl Combatant for Character {
    fn id(&self) -> CharacterId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn hit_points(&self) -> i32 {
        self.hit_points.current
    }

    fn level(&self) -> u32 {
        self.level
    }

    fn size(&self) -> SizeClass {
        self.size
    }

    fn attribute_modifier(&self, attribute: Attribute) -> i32 {
        self.attributes.modifier(attribute)
    }

    fn attacks(&self) -> &[Attack] {
        &self.attacks
    }

    fn skill(&self, skill: Skill) -> i32 {
        self.skills.get(skill)
    }

    fn armor_at(&self, location: HitLocation) -> Option<i32> {
        self.armor.get(&location).copied()
    }

    fn apply_damage(&mut self, amount: i32) -> DamageOutcome {
        self.hit_points.current = (self.hit_points.current - amount.max(0)).max(0);
        if self.hit_points.current == 0 {
            DamageOutcome::Died
        } else {
            DamageOutcome::Wounded {
                remaining: self.hit_points.current,
            }
        }
    }

    fn add_experience(&mut self, level: u32) {
        self.experience += u64::from(level.max(1)) * XP_PER_LEVEL;
    }

    fn add_kill(&mut self, _victim: &Self) {
        self.kills += 1;
    }

    fn send_immediate(&self, message: GameMessage) {
        if let Controller::Player { session } = &self.controller {
            if session.send(message).is_err() {
                trace!(character = %self.id, "session closed; message dropped");
            }
        }
    }
}
