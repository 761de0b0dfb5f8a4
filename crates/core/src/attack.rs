//! Attack definitions and body locations.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Body part struck by a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitLocation {
    /// Feet.
    Feet,
    /// Legs.
    Legs,
    /// Torso, front.
    Body,
    /// Torso, rear.
    Back,
    /// Arms.
    Arms,
    /// Hands.
    Hands,
    /// Neck.
    Neck,
    /// Head.
    Head,
}

impl HitLocation {
    /// Every location, feet to head.
    pub const ALL: [HitLocation; 8] = [
        HitLocation::Feet,
        HitLocation::Legs,
        HitLocation::Body,
        HitLocation::Back,
        HitLocation::Arms,
        HitLocation::Hands,
        HitLocation::Neck,
        HitLocation::Head,
    ];

    /// Name used in combat messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            HitLocation::Feet => "feet",
            HitLocation::Legs => "legs",
            HitLocation::Body => "body",
            HitLocation::Back => "back",
            HitLocation::Arms => "arms",
            HitLocation::Hands => "hands",
            HitLocation::Neck => "neck",
            HitLocation::Head => "head",
        }
    }
}

/// Damage flavour carried by an attack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    /// Fists, clubs, maces.
    #[default]
    Bludgeoning,
    /// Blades.
    Slashing,
    /// Spears, daggers, arrows, teeth.
    Piercing,
}

/// Verb pair used to narrate an attack ("slash" / "slashes").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackVerbs {
    /// Second-person form, shown to the attacker.
    pub first_person: String,
    /// Third-person form, shown to everyone else.
    pub third_person: String,
}

impl AttackVerbs {
    /// Build a verb pair.
    pub fn new(first_person: impl Into<String>, third_person: impl Into<String>) -> Self {
        Self {
            first_person: first_person.into(),
            third_person: third_person.into(),
        }
    }
}

/// One attack a character can make per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    /// Short label ("longsword", "bite").
    pub name: String,
    /// Minimum base damage.
    pub min_damage: i32,
    /// Maximum base damage.
    pub max_damage: i32,
    /// Damage flavour.
    pub damage_type: DamageType,
    /// Attack rolls inside this range are critical hits.
    pub critical_range: RangeInclusive<i32>,
    /// Damage multiplier applied on a critical hit.
    pub critical_multiplier: i32,
    /// Narration verbs.
    pub verbs: AttackVerbs,
}

impl Attack {
    /// Bare-handed attack every character falls back to.
    pub fn unarmed() -> Self {
        Self {
            name: "fists".to_string(),
            min_damage: 1,
            max_damage: 2,
            damage_type: DamageType::Bludgeoning,
            critical_range: 20..=20,
            critical_multiplier: 2,
            verbs: AttackVerbs::new("punch", "punches"),
        }
    }

    /// Zero-damage attack used when attack data is missing.
    pub fn inert() -> Self {
        Self {
            name: "flailing".to_string(),
            min_damage: 0,
            max_damage: 0,
            damage_type: DamageType::Bludgeoning,
            critical_range: 21..=20,
            critical_multiplier: 1,
            verbs: AttackVerbs::new("flail at", "flails at"),
        }
    }

    /// Whether an attack roll lands in the critical range.
    pub fn is_critical(&self, roll: i32) -> bool {
        self.critical_range.contains(&roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_range_is_inclusive() {
        let mut attack = Attack::unarmed();
        attack.critical_range = 19..=20;
        assert!(!attack.is_critical(18));
        assert!(attack.is_critical(19));
        assert!(attack.is_critical(20));
    }

    #[test]
    fn inert_attack_never_crits() {
        let attack = Attack::inert();
        assert!((1..=20).all(|roll| !attack.is_critical(roll)));
        assert_eq!(attack.max_damage, 0);
    }

    #[test]
    fn attack_serializes_range_bounds() {
        let json = serde_json::to_value(Attack::unarmed()).unwrap();
        assert_eq!(json["critical_range"]["start"], 20);
        assert_eq!(json["critical_range"]["end"], 20);
        assert_eq!(json["damage_type"], "bludgeoning");
    }
}
