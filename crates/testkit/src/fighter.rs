//! Stand-alone combatants and observers for combat tests.

use mudsim_combat::{Combatant, DamageOutcome, RoomObserver};
use mudsim_core::{
    Attack, Attribute, AttributeScores, CharacterId, GameMessage, HitLocation, SizeClass, Skill,
    Skills,
};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Experience awarded per level of a defeated [`TestFighter`].
pub const TEST_XP_PER_LEVEL: u64 = 100;

/// Minimal character with every combat knob exposed.
#[derive(Debug, Clone)]
pub struct TestFighter {
    /// Identity.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Current hit points.
    pub hit_points: i32,
    /// Level.
    pub level: u32,
    /// Size class.
    pub size: SizeClass,
    /// Attribute scores.
    pub attributes: AttributeScores,
    /// Skill levels.
    pub skills: Skills,
    /// Attacks per round.
    pub attacks: Vec<Attack>,
    /// Armour class by location.
    pub armor: BTreeMap<HitLocation, i32>,
    /// Experience earned.
    pub experience: u64,
    /// Victims, in kill order.
    pub kills: Vec<CharacterId>,
    inbox: RefCell<Vec<GameMessage>>,
}

impl TestFighter {
    /// Medium, baseline-attribute fighter with 20 hit points and bare hands.
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id: CharacterId(id),
            name: name.to_string(),
            hit_points: 20,
            level: 1,
            size: SizeClass::Medium,
            attributes: AttributeScores::baseline(),
            skills: Skills::new(),
            attacks: vec![Attack::unarmed()],
            armor: BTreeMap::new(),
            experience: 0,
            kills: Vec::new(),
            inbox: RefCell::new(Vec::new()),
        }
    }

    /// Set hit points.
    pub fn with_hit_points(mut self, hit_points: i32) -> Self {
        self.hit_points = hit_points;
        self
    }

    /// Set level.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Set size class.
    pub fn with_size(mut self, size: SizeClass) -> Self {
        self.size = size;
        self
    }

    /// Set one attribute score.
    pub fn with_attribute(mut self, attribute: Attribute, score: i32) -> Self {
        match attribute {
            Attribute::Strength => self.attributes.strength = score,
            Attribute::Dexterity => self.attributes.dexterity = score,
            Attribute::Constitution => self.attributes.constitution = score,
            Attribute::Intelligence => self.attributes.intelligence = score,
            Attribute::Wisdom => self.attributes.wisdom = score,
            Attribute::Charisma => self.attributes.charisma = score,
        }
        self
    }

    /// Set one skill.
    pub fn with_skill(mut self, skill: Skill, level: i32) -> Self {
        self.skills.set(skill, level);
        self
    }

    /// Replace the attack list.
    pub fn with_attacks(mut self, attacks: Vec<Attack>) -> Self {
        self.attacks = attacks;
        self
    }

    /// Wear armour over one location.
    pub fn with_armor(mut self, location: HitLocation, armor_class: i32) -> Self {
        self.armor.insert(location, armor_class);
        self
    }

    /// Wear the same armour class everywhere.
    pub fn with_full_armor(mut self, armor_class: i32) -> Self {
        for location in HitLocation::ALL {
            self.armor.insert(location, armor_class);
        }
        self
    }

    /// Texts of every message sent directly to this fighter.
    pub fn messages(&self) -> Vec<String> {
        self.inbox.borrow().iter().map(|m| m.text.clone()).collect()
    }
}

impl Combatant for TestFighter {
    fn id(&self) -> CharacterId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn hit_points(&self) -> i32 {
        self.hit_points
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
        self.hit_points = (self.hit_points - amount.max(0)).max(0);
        if self.hit_points == 0 {
            DamageOutcome::Died
        } else {
            DamageOutcome::Wounded {
                remaining: self.hit_points,
            }
        }
    }

    fn add_experience(&mut self, level: u32) {
        self.experience += u64::from(level.max(1)) * TEST_XP_PER_LEVEL;
    }

    fn add_kill(&mut self, victim: &Self) {
        self.kills.push(victim.id);
    }

    fn send_immediate(&self, message: GameMessage) {
        self.inbox.borrow_mut().push(message);
    }
}

/// Room stand-in that records every broadcast.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    sent: RefCell<Vec<(Vec<CharacterId>, GameMessage)>>,
}

impl RecordingObserver {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcast texts in send order.
    pub fn texts(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(_, m)| m.text.clone()).collect()
    }

    /// Exclude lists in send order.
    pub fn excludes(&self) -> Vec<Vec<CharacterId>> {
        self.sent.borrow().iter().map(|(e, _)| e.clone()).collect()
    }

    /// Number of broadcasts.
    pub fn len(&self) -> usize {
        self.sent.borrow().len()
    }

    /// True when nothing was broadcast.
    pub fn is_empty(&self) -> bool {
        self.sent.borrow().is_empty()
    }
}

impl RoomObserver for RecordingObserver {
    fn send_immediate(&self, exclude: &[CharacterId], message: GameMessage) {
        self.sent.borrow_mut().push((exclude.to_vec(), message));
    }
}
