//! Serializable forms of world state.
//!
//! Records are what persistence reads and writes; live types are rebuilt
//! from them. Non-player characters are not recorded: their spawners are,
//! and repopulate rooms after a load.

use crate::behavior::{Aggressive, Behavior, Chatty, Passive};
use mudsim_core::{
    Attack, AreaId, AttributeScores, CharacterId, HitLocation, RoomId, SimTick, SizeClass, Skills,
    SpawnerId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A current/base pair such as hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    /// Current value, never above `base`.
    pub current: i32,
    /// Maximum value.
    pub base: i32,
}

impl Vitals {
    /// Full pool of `base`.
    pub fn full(base: i32) -> Self {
        Self {
            current: base,
            base,
        }
    }

    /// Regain `amount`, capped at base.
    pub fn restore(&mut self, amount: i32) {
        self.current = (self.current + amount.max(0)).min(self.base);
    }

    /// Reset to base.
    pub fn refill(&mut self) {
        self.current = self.base;
    }

    /// True when below base.
    pub fn is_depleted(&self) -> bool {
        self.current < self.base
    }
}

/// Saved player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Stable id.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Level.
    pub level: u32,
    /// Experience points.
    pub experience: u64,
    /// Lifetime kills.
    pub kills: u32,
    /// Size class.
    pub size: SizeClass,
    /// Attribute scores.
    pub attributes: AttributeScores,
    /// Trained skills.
    pub skills: Skills,
    /// Attacks per round.
    pub attacks: Vec<Attack>,
    /// Armour class by location.
    pub armor: BTreeMap<HitLocation, i32>,
    /// Hit points.
    pub hit_points: Vitals,
    /// Mana.
    pub mana: Vitals,
    /// Energy.
    pub energy: Vitals,
    /// Room the character was last in.
    pub room: Option<RoomId>,
}

impl CharacterRecord {
    /// Level-one human with bare hands and no saved room.
    pub fn new_player(id: CharacterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            level: 1,
            experience: 0,
            kills: 0,
            size: SizeClass::Medium,
            attributes: AttributeScores::baseline(),
            skills: Skills::new(),
            attacks: vec![Attack::unarmed()],
            armor: BTreeMap::new(),
            hit_points: Vitals::full(20),
            mana: Vitals::full(10),
            energy: Vitals::full(10),
            room: None,
        }
    }
}

/// How a spawned non-player character behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorSpec {
    /// Never starts anything.
    Passive,
    /// Attacks players on sight.
    Aggressive,
    /// Repeats a line.
    Chatty {
        /// What it says.
        line: String,
        /// Ticks between lines.
        every_ticks: u64,
    },
}

impl Default for BehaviorSpec {
    fn default() -> Self {
        Self::Passive
    }
}

impl BehaviorSpec {
    /// Build the strategy object.
    pub fn build(&self) -> Box<dyn Behavior> {
        match self {
            Self::Passive => Box::new(Passive),
            Self::Aggressive => Box::new(Aggressive),
            Self::Chatty { line, every_ticks } => Box::new(Chatty::new(line.clone(), *every_ticks)),
        }
    }
}

/// Blueprint a spawner stamps out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcTemplate {
    /// Display name of every spawned copy.
    pub name: String,
    /// Level.
    pub level: u32,
    /// Size class.
    pub size: SizeClass,
    /// Attribute scores.
    pub attributes: AttributeScores,
    /// Trained skills.
    pub skills: Skills,
    /// Attacks per round.
    pub attacks: Vec<Attack>,
    /// Armour class by location.
    pub armor: BTreeMap<HitLocation, i32>,
    /// Base hit points.
    pub hit_points: i32,
    /// Base mana.
    pub mana: i32,
    /// Base energy.
    pub energy: i32,
    /// AI strategy.
    pub behavior: BehaviorSpec,
}

impl NpcTemplate {
    /// Medium, bare-handed, passive template.
    pub fn new(name: impl Into<String>, level: u32, hit_points: i32) -> Self {
        Self {
            name: name.into(),
            level,
            size: SizeClass::Medium,
            attributes: AttributeScores::baseline(),
            skills: Skills::new(),
            attacks: vec![Attack::unarmed()],
            armor: BTreeMap::new(),
            hit_points,
            mana: 0,
            energy: 10,
            behavior: BehaviorSpec::Passive,
        }
    }

    /// Replace the behaviour.
    pub fn with_behavior(mut self, behavior: BehaviorSpec) -> Self {
        self.behavior = behavior;
        self
    }

    /// Replace the attack list.
    pub fn with_attacks(mut self, attacks: Vec<Attack>) -> Self {
        self.attacks = attacks;
        self
    }

    /// Replace the size class.
    pub fn with_size(mut self, size: SizeClass) -> Self {
        self.size = size;
        self
    }
}

/// Saved spawner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnerRecord {
    /// Stable id.
    pub id: SpawnerId,
    /// What it spawns.
    pub template: NpcTemplate,
    /// Population it tops up to.
    pub max_population: usize,
    /// Ticks between top-ups.
    pub interval_ticks: u32,
}

/// Saved room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Stable id.
    pub id: RoomId,
    /// Short title.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Spawners placed in the room.
    pub spawners: Vec<SpawnerRecord>,
}

/// Saved area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRecord {
    /// Stable id.
    pub id: AreaId,
    /// Display name.
    pub name: String,
    /// Rooms, in id order.
    pub rooms: Vec<RoomRecord>,
}

/// Clock and allocator state saved next to the areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMeta {
    /// Tick the snapshot was taken on.
    pub tick: SimTick,
    /// Next character id to hand out.
    pub next_character_id: u64,
}

/// Everything a save point writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Clock and allocator state.
    pub meta: WorldMeta,
    /// Every area.
    pub areas: Vec<AreaRecord>,
    /// Players online when the snapshot was taken.
    pub characters: Vec<CharacterRecord>,
}
