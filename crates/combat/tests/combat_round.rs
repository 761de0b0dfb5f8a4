//! Single-combat round resolution.

use mudsim_combat::{Combat, Combatant, RoundOutcome};
use mudsim_core::{Attack, AttackVerbs, Attribute, DamageType, HitLocation, SizeClass, Skill};
use mudsim_testkit::{RecordingObserver, TestFighter, TEST_XP_PER_LEVEL};

const SEED: u64 = 0xC0FFEE;

fn fixed_attack(damage: i32) -> Attack {
    Attack {
        name: "club".to_string(),
        min_damage: damage,
        max_damage: damage,
        damage_type: DamageType::Bludgeoning,
        critical_range: 21..=20,
        critical_multiplier: 1,
        verbs: AttackVerbs::new("club", "clubs"),
    }
}

fn pair() -> (TestFighter, TestFighter, Combat) {
    let attacker = TestFighter::new(1, "Aria");
    let defender = TestFighter::new(2, "Brom");
    let combat = Combat::seeded(attacker.id, defender.id, SEED);
    (attacker, defender, combat)
}

#[test]
fn low_roll_against_solid_defense_misses() {
    let (mut attacker, mut defender, mut combat) = pair();
    let room = RecordingObserver::new();
    combat.set_next_dice_roll(1);

    let outcome = combat.process_round(&mut attacker, &mut defender, &room);

    assert_eq!(outcome, RoundOutcome::Continue);
    assert_eq!(defender.hit_points, 20);
    assert_eq!(combat.round(), 0);
    assert_eq!(attacker.messages(), vec!["You punch at Brom but miss."]);
    assert_eq!(defender.messages(), vec!["Aria misses you."]);
    assert_eq!(room.texts(), vec!["Aria misses Brom."]);
    assert_eq!(room.excludes(), vec![vec![attacker.id, defender.id]]);
}

#[test]
fn high_roll_kills_a_wounded_defender() {
    let (mut attacker, _, mut combat) = pair();
    let mut defender = TestFighter::new(2, "Brom").with_hit_points(1).with_level(3);
    let room = RecordingObserver::new();
    combat.set_next_dice_roll(20);

    let outcome = combat.process_round(&mut attacker, &mut defender, &room);

    assert_eq!(outcome, RoundOutcome::DefenderDead);
    assert_eq!(defender.hit_points, 0);
    assert_eq!(attacker.kills, vec![defender.id]);
    assert_eq!(attacker.experience, 3 * TEST_XP_PER_LEVEL);
    assert!(attacker.messages().contains(&"You have slain Brom!".to_string()));
    assert!(defender.messages().contains(&"You have been slain by Aria!".to_string()));
    assert_eq!(room.texts().last().map(String::as_str), Some("Brom has been slain by Aria!"));
}

#[test]
fn dead_participants_do_not_act() {
    let (_, mut defender, mut combat) = pair();
    let mut corpse = TestFighter::new(1, "Aria").with_hit_points(0);
    let room = RecordingObserver::new();

    assert_eq!(
        combat.process_round(&mut corpse, &mut defender, &room),
        RoundOutcome::AttackerDead
    );

    let mut attacker = TestFighter::new(1, "Aria");
    let mut fallen = TestFighter::new(2, "Brom").with_hit_points(0);
    assert_eq!(
        combat.process_round(&mut attacker, &mut fallen, &room),
        RoundOutcome::DefenderDead
    );
    assert!(room.is_empty());
    assert!(attacker.kills.is_empty());
}

#[test]
fn opening_round_adds_backstab_damage_once() {
    let (_, mut defender, mut combat) = pair();
    defender.hit_points = 100;
    let mut attacker = TestFighter::new(1, "Aria")
        .with_skill(Skill::Backstab, 25)
        .with_attacks(vec![fixed_attack(3)]);
    let room = RecordingObserver::new();

    combat.set_next_dice_roll(18);
    assert_eq!(
        combat.process_round(&mut attacker, &mut defender, &room),
        RoundOutcome::Continue
    );
    // 3 base + (25 / 10 + 1) * 6 backstab
    assert_eq!(defender.hit_points, 100 - 21);
    assert_eq!(combat.round(), 1);

    combat.set_next_dice_roll(18);
    combat.process_round(&mut attacker, &mut defender, &room);
    assert_eq!(defender.hit_points, 79 - 3);
    assert_eq!(combat.round(), 2);
}

#[test]
fn backstab_skill_also_helps_to_hit_on_the_opening_round() {
    let (_, mut defender, mut combat) = pair();
    defender.hit_points = 100;
    let mut attacker = TestFighter::new(1, "Aria").with_skill(Skill::Backstab, 30);
    let room = RecordingObserver::new();

    // 8 + 3 backstab > 10 defense
    combat.set_next_dice_roll(8);
    assert_eq!(
        combat.process_round(&mut attacker, &mut defender, &room),
        RoundOutcome::Continue
    );
    // fists plus (30 / 10 + 1) * 6 backstab
    assert!((100 - 26..=100 - 25).contains(&defender.hit_points));
    assert_eq!(combat.round(), 1);

    let before = defender.hit_points;
    combat.set_next_dice_roll(8);
    combat.process_round(&mut attacker, &mut defender, &room);
    assert_eq!(defender.hit_points, before);
}

#[test]
fn critical_hits_multiply_damage() {
    let (_, mut defender, mut combat) = pair();
    defender.hit_points = 100;
    let mut crit = fixed_attack(4);
    crit.critical_range = 19..=20;
    crit.critical_multiplier = 3;
    let mut attacker = TestFighter::new(1, "Aria").with_attacks(vec![crit]);
    let room = RecordingObserver::new();

    // Spend the opening round on a plain hit.
    combat.set_next_dice_roll(15);
    combat.process_round(&mut attacker, &mut defender, &room);
    let after_opening = defender.hit_points;

    combat.set_next_dice_roll(19);
    combat.process_round(&mut attacker, &mut defender, &room);
    assert_eq!(after_opening - defender.hit_points, 12);
    assert!(attacker
        .messages()
        .last()
        .is_some_and(|text| text.ends_with("A critical hit!")));
}

#[test]
fn armour_only_mitigates_the_struck_location() {
    let (_, _, mut combat) = pair();
    let mut attacker = TestFighter::new(1, "Aria").with_attacks(vec![fixed_attack(10)]);
    let mut defender = TestFighter::new(2, "Brom")
        .with_hit_points(100)
        .with_armor(HitLocation::Feet, 5)
        .with_skill(Skill::Armor, 20);
    let room = RecordingObserver::new();

    // Opening round: 10 + 6 backstab, feet armour 5 + 20 / 10.
    combat.set_next_location_rolls(&[1]);
    combat.set_next_dice_roll(15);
    combat.process_round(&mut attacker, &mut defender, &room);
    assert_eq!(defender.hit_points, 100 - 9);
    assert!(attacker.messages()[0].contains("Brom's feet"));

    // Head is bare.
    combat.set_next_location_rolls(&[100]);
    combat.set_next_dice_roll(15);
    combat.process_round(&mut attacker, &mut defender, &room);
    assert_eq!(defender.hit_points, 91 - 10);
}

#[test]
fn heavy_armour_floors_damage_at_zero() {
    let (mut attacker, _, mut combat) = pair();
    let mut defender = TestFighter::new(2, "Brom").with_full_armor(50);
    let room = RecordingObserver::new();

    combat.set_next_dice_roll(20);
    let outcome = combat.process_round(&mut attacker, &mut defender, &room);

    assert_eq!(outcome, RoundOutcome::Continue);
    assert_eq!(defender.hit_points, 20);
    assert_eq!(combat.round(), 1);
    assert!(attacker.messages()[0].ends_with("for 0 damage. A critical hit!"));
}

#[test]
fn size_difference_shifts_the_hit_bonus() {
    let room = RecordingObserver::new();

    let mut medium = TestFighter::new(1, "Aria");
    let mut target = TestFighter::new(2, "Brom");
    let mut even = Combat::seeded(medium.id, target.id, SEED);
    even.set_next_dice_roll(9);
    even.process_round(&mut medium, &mut target, &room);
    assert_eq!(target.hit_points, 20);

    let mut ogre = TestFighter::new(3, "Ogre").with_size(SizeClass::Large);
    let mut larger = Combat::seeded(ogre.id, target.id, SEED);
    larger.set_next_dice_roll(9);
    larger.process_round(&mut ogre, &mut target, &room);
    assert!(target.hit_points < 20);
}

#[test]
fn dexterity_and_defense_skill_raise_the_bar() {
    let room = RecordingObserver::new();
    let mut attacker = TestFighter::new(1, "Aria")
        .with_attribute(Attribute::Strength, 14)
        .with_skill(Skill::Attack, 40);
    let mut nimble = TestFighter::new(2, "Wisp")
        .with_attribute(Attribute::Dexterity, 16)
        .with_skill(Skill::Defense, 30);
    let mut combat = Combat::seeded(attacker.id, nimble.id, SEED);

    // bonus 2 + 4 = 6; defense 10 + 3 + 3 = 16
    combat.set_next_dice_roll(10);
    combat.process_round(&mut attacker, &mut nimble, &room);
    assert_eq!(nimble.hit_points, 20);

    combat.set_next_dice_roll(11);
    combat.process_round(&mut attacker, &mut nimble, &room);
    assert!(nimble.hit_points < 20);
}

#[test]
fn a_miss_skips_the_remaining_attacks() {
    let (_, mut defender, mut combat) = pair();
    let mut attacker = TestFighter::new(1, "Aria").with_attacks(vec![fixed_attack(2), fixed_attack(2)]);
    let room = RecordingObserver::new();

    combat.set_next_dice_roll(2);
    combat.process_round(&mut attacker, &mut defender, &room);

    assert_eq!(attacker.messages().len(), 1);
    assert_eq!(room.len(), 1);
}

#[test]
fn every_attack_lands_when_each_roll_hits() {
    let (_, mut defender, mut combat) = pair();
    defender.hit_points = 200;
    let mut attacker = TestFighter::new(1, "Aria")
        .with_attribute(Attribute::Strength, 30)
        .with_attacks(vec![fixed_attack(1), fixed_attack(1)]);
    let room = RecordingObserver::new();

    // Strength +10 guarantees a hit on any d20 roll.
    combat.process_round(&mut attacker, &mut defender, &room);

    assert_eq!(room.len(), 2);
    assert_eq!(combat.round(), 1);
}

#[test]
fn missing_attacks_fall_back_to_an_inert_swing() {
    let (_, mut defender, mut combat) = pair();
    let mut attacker = TestFighter::new(1, "Aria").with_attacks(Vec::new());
    let room = RecordingObserver::new();

    combat.set_next_dice_roll(19);
    let outcome = combat.process_round(&mut attacker, &mut defender, &room);

    assert_eq!(outcome, RoundOutcome::Continue);
    assert!(attacker.messages()[0].starts_with("You flail at Brom's"));
}

#[test]
fn seeded_combats_replay_identically() {
    let run = || {
        let mut attacker = TestFighter::new(1, "Aria").with_skill(Skill::Attack, 30);
        let mut defender = TestFighter::new(2, "Brom").with_hit_points(500);
        let mut combat = Combat::seeded(attacker.id, defender.id, 42);
        let room = RecordingObserver::new();
        for _ in 0..25 {
            combat.process_round(&mut attacker, &mut defender, &room);
        }
        (defender.hit_points(), room.texts())
    };

    assert_eq!(run(), run());
}
