//! Size classes, attributes and skills used by combat.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Physical size class of a character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    /// Rats, sprites.
    Tiny,
    /// Halflings, dogs.
    Small,
    /// Humans.
    #[default]
    Medium,
    /// Ogres, horses.
    Large,
    /// Giants.
    Huge,
    /// Dragons.
    Colossal,
}

impl SizeClass {
    /// Ordinal rank, tiny = 0 through colossal = 5.
    pub const fn rank(self) -> i32 {
        match self {
            SizeClass::Tiny => 0,
            SizeClass::Small => 1,
            SizeClass::Medium => 2,
            SizeClass::Large => 3,
            SizeClass::Huge => 4,
            SizeClass::Colossal => 5,
        }
    }

    /// Signed size difference `attacker - defender`; positive when the attacker is larger.
    pub fn difference(attacker: SizeClass, defender: SizeClass) -> i32 {
        attacker.rank() - defender.rank()
    }
}

/// Primary attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Melee hit and damage.
    Strength,
    /// Defense and initiative.
    Dexterity,
    /// Toughness.
    Constitution,
    /// Reasoning.
    Intelligence,
    /// Perception.
    Wisdom,
    /// Presence.
    Charisma,
}

/// Attribute scores with the classic `(score - 10) / 2` modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeScores {
    /// Strength score.
    pub strength: i32,
    /// Dexterity score.
    pub dexterity: i32,
    /// Constitution score.
    pub constitution: i32,
    /// Intelligence score.
    pub intelligence: i32,
    /// Wisdom score.
    pub wisdom: i32,
    /// Charisma score.
    pub charisma: i32,
}

impl AttributeScores {
    /// All scores at the human baseline of 10.
    pub const fn baseline() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }

    /// Raw score for an attribute.
    pub fn score(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Constitution => self.constitution,
            Attribute::Intelligence => self.intelligence,
            Attribute::Wisdom => self.wisdom,
            Attribute::Charisma => self.charisma,
        }
    }

    /// Modifier for an attribute, rounded toward negative infinity.
    pub fn modifier(&self, attribute: Attribute) -> i32 {
        (self.score(attribute) - 10).div_euclid(2)
    }
}

impl Default for AttributeScores {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Trained skill consulted by combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    /// Adds `skill / 10` to hit.
    Attack,
    /// Opening-round bonus to hit and damage.
    Backstab,
    /// Adds `skill / 10` to defense.
    Defense,
    /// Adds `skill / 10` to armour mitigation.
    Armor,
}

impl Skill {
    /// Canonical lowercase key for configs and logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Skill::Attack => "attack",
            Skill::Backstab => "backstab",
            Skill::Defense => "defense",
            Skill::Armor => "armor",
        }
    }

    /// Parse a skill from its key (case-insensitive).
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "attack" => Some(Skill::Attack),
            "backstab" => Some(Skill::Backstab),
            "defense" | "defence" => Some(Skill::Defense),
            "armor" | "armour" => Some(Skill::Armor),
            _ => None,
        }
    }
}

/// Skill levels (0..100+); untrained skills read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skills(BTreeMap<Skill, i32>);

impl Skills {
    /// Empty skill set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, skill: Skill, level: i32) -> Self {
        self.set(skill, level);
        self
    }

    /// Set a skill level (negative levels clamp to zero).
    pub fn set(&mut self, skill: Skill, level: i32) {
        self.0.insert(skill, level.max(0));
    }

    /// Current level of a skill.
    pub fn get(&self, skill: Skill) -> i32 {
        self.0.get(&skill).copied().unwrap_or(0)
    }
}
