//! One attacker against one defender.

use crate::location::{hit_location, LOCATION_DIE_SIDES};
use crate::{Combatant, DamageOutcome, RoomObserver};
use mudsim_core::{scoped_rng, Attack, Attribute, CharacterId, DiceBag, GameMessage, HitLocation, SizeClass, Skill};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Defense score before dexterity and skill.
pub const BASE_DEFENSE: i32 = 10;

/// Complete d20 sets loaded into each attack bag.
pub const ATTACK_DIE_SETS: u32 = 3;

const ATTACK_DIE_SIDES: i32 = 20;
const BACKSTAB_DAMAGE_PER_STEP: i32 = 6;

/// Result of one attacker's round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// Nobody died; the fight goes on.
    Continue,
    /// The attacker was already down and did not act.
    AttackerDead,
    /// The defender is down.
    DefenderDead,
}

/// One-directional fight: `attacker` swings at `defender` once per round.
#[derive(Debug, Clone)]
pub struct Combat {
    attacker: CharacterId,
    defender: CharacterId,
    round: u32,
    next_roll: Option<i32>,
    attack_dice: DiceBag,
    location_dice: DiceBag,
    damage_rng: StdRng,
}

impl Combat {
    /// Pair an attacker with a defender, seeding dice from OS entropy.
    pub fn new(attacker: CharacterId, defender: CharacterId) -> Self {
        Self::build(attacker, defender, None)
    }

    /// Pair an attacker with a defender using reproducible dice.
    pub fn seeded(attacker: CharacterId, defender: CharacterId, seed: u64) -> Self {
        Self::build(attacker, defender, Some(seed))
    }

    fn build(attacker: CharacterId, defender: CharacterId, seed: Option<u64>) -> Self {
        Self {
            attacker,
            defender,
            round: 0,
            next_roll: None,
            attack_dice: DiceBag::with_rng(1, ATTACK_DIE_SIDES, ATTACK_DIE_SETS, scoped_rng(seed, 1)),
            location_dice: DiceBag::with_rng(1, LOCATION_DIE_SIDES, 1, scoped_rng(seed, 2)),
            damage_rng: scoped_rng(seed, 3),
        }
    }

    /// Attacking character.
    pub fn attacker(&self) -> CharacterId {
        self.attacker
    }

    /// Defending character.
    pub fn defender(&self) -> CharacterId {
        self.defender
    }

    /// Completed rounds; round 0 is the opening strike.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Force the next attack roll.
    pub fn set_next_dice_roll(&mut self, roll: i32) {
        self.next_roll = Some(roll);
    }

    /// Force upcoming hit-location rolls.
    pub fn set_next_location_rolls(&mut self, rolls: &[i32]) {
        self.location_dice.set_next_results(rolls);
    }

    /// Resolve one round of attacks.
    ///
    /// A miss ends the round at once, as does a kill. Only a round in which
    /// every attack connected advances the round counter.
    pub fn process_round<C, O>(&mut self, attacker: &mut C, defender: &mut C, room: &O) -> RoundOutcome
    where
        C: Combatant,
        O: RoomObserver + ?Sized,
    {
        if attacker.hit_points() <= 0 {
            return RoundOutcome::AttackerDead;
        }
        if defender.hit_points() <= 0 {
            return RoundOutcome::DefenderDead;
        }

        let size_difference = SizeClass::difference(attacker.size(), defender.size());
        let opening = self.round == 0;

        let mut attacks = attacker.attacks().to_vec();
        if attacks.is_empty() {
            warn!(attacker = %attacker.id(), "no attacks configured; using inert fallback");
            attacks.push(Attack::inert());
        }

        for attack in &attacks {
            let location = hit_location(size_difference, self.location_dice.roll());
            let roll = self
                .next_roll
                .take()
                .unwrap_or_else(|| self.attack_dice.roll());

            let bonus = hit_bonus(&*attacker, size_difference, opening);
            let defense = defense_score(&*defender);
            if roll + bonus <= defense {
                debug!(
                    attacker = %attacker.id(),
                    defender = %defender.id(),
                    roll,
                    bonus,
                    defense,
                    "attack missed"
                );
                announce_miss(&*attacker, &*defender, attack, room);
                return RoundOutcome::Continue;
            }

            let critical = attack.is_critical(roll);
            let raw = self.roll_damage(&*attacker, attack, critical, opening);
            let damage = (raw - mitigation(&*defender, location)).max(0);
            let outcome = defender.apply_damage(damage);
            debug!(
                attacker = %attacker.id(),
                defender = %defender.id(),
                roll,
                location = location.as_str(),
                raw,
                damage,
                critical,
                "attack hit"
            );
            announce_hit(&*attacker, &*defender, attack, location, damage, critical, room);

            if outcome == DamageOutcome::Died || defender.hit_points() <= 0 {
                attacker.add_kill(&*defender);
                attacker.add_experience(defender.level());
                announce_death(&*attacker, &*defender, room);
                return RoundOutcome::DefenderDead;
            }
        }

        self.round += 1;
        RoundOutcome::Continue
    }

    fn roll_damage<C: Combatant>(&mut self, attacker: &C, attack: &Attack, critical: bool, opening: bool) -> i32 {
        let strength = attacker.attribute_modifier(Attribute::Strength);
        let low = attack.min_damage.max(strength);
        let high = attack.max_damage.max(strength + 1).max(low);

        let mut damage = self.damage_rng.gen_range(low..=high);
        if critical {
            damage *= attack.critical_multiplier.max(1);
        }
        if opening {
            damage += (attacker.skill(Skill::Backstab) / 10 + 1) * BACKSTAB_DAMAGE_PER_STEP;
        }
        damage
    }
}

/// Attacker's bonus to hit.
pub(crate) fn hit_bonus<C: Combatant>(attacker: &C, size_difference: i32, opening: bool) -> i32 {
    let mut bonus = size_difference * 2
        + attacker.attribute_modifier(Attribute::Strength)
        + attacker.skill(Skill::Attack) / 10;
    if opening {
        bonus += attacker.skill(Skill::Backstab) / 10;
    }
    bonus
}

/// Score an attack roll plus bonus must beat.
pub(crate) fn defense_score<C: Combatant>(defender: &C) -> i32 {
    BASE_DEFENSE + defender.attribute_modifier(Attribute::Dexterity) + defender.skill(Skill::Defense) / 10
}

fn mitigation<C: Combatant>(defender: &C, location: HitLocation) -> i32 {
    defender
        .armor_at(location)
        .map_or(0, |armor_class| armor_class + defender.skill(Skill::Armor) / 10)
}

fn announce_miss<C: Combatant, O: RoomObserver + ?Sized>(attacker: &C, defender: &C, attack: &Attack, room: &O) {
    attacker.send_immediate(GameMessage::combat(format!(
        "You {} at {} but miss.",
        attack.verbs.first_person,
        defender.name()
    )));
    defender.send_immediate(GameMessage::combat(format!("{} misses you.", attacker.name())));
    room.send_immediate(
        &[attacker.id(), defender.id()],
        GameMessage::combat(format!("{} misses {}.", attacker.name(), defender.name())),
    );
}

fn announce_hit<C: Combatant, O: RoomObserver + ?Sized>(
    attacker: &C,
    defender: &C,
    attack: &Attack,
    location: HitLocation,
    damage: i32,
    critical: bool,
    room: &O,
) {
    let flourish = if critical { " A critical hit!" } else { "" };
    attacker.send_immediate(GameMessage::combat(format!(
        "You {} {}'s {} for {} damage.{}",
        attack.verbs.first_person,
        defender.name(),
        location.as_str(),
        damage,
        flourish
    )));
    defender.send_immediate(GameMessage::combat(format!(
        "{} {} your {} for {} damage.{}",
        attacker.name(),
        attack.verbs.third_person,
        location.as_str(),
        damage,
        flourish
    )));
    room.send_immediate(
        &[attacker.id(), defender.id()],
        GameMessage::combat(format!(
            "{} {} {}'s {}.",
            attacker.name(),
            attack.verbs.third_person,
            defender.name(),
            location.as_str()
        )),
    );
}

fn announce_death<C: Combatant, O: RoomObserver + ?Sized>(attacker: &C, defender: &C, room: &O) {
    attacker.send_immediate(GameMessage::death(format!("You have slain {}!", defender.name())));
    defender.send_immediate(GameMessage::death(format!(
        "You have been slain by {}!",
        attacker.name()
    )));
    room.send_immediate(
        &[attacker.id(), defender.id()],
        GameMessage::death(format!(
            "{} has been slain by {}!",
            defender.name(),
            attacker.name()
        )),
    );
}
