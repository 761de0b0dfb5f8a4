//! Built-in starter world used when the data directory is empty.

use mudsim_core::{
    AreaId, Attack, AttackVerbs, DamageType, HitLocation, RoomId, SimTick, SizeClass, Skill, SpawnerId,
};
use mudsim_world::{AreaRecord, BehaviorSpec, NpcTemplate, RoomRecord, SpawnerRecord, WorldMeta, WorldSnapshot};

/// Town square: where new players appear.
pub const STARTER_SQUARE: RoomId = RoomId(1);
/// Temple: where the dead wake up.
pub const STARTER_TEMPLE: RoomId = RoomId(4);

fn rusty_dagger() -> Attack {
    Attack {
        name: "rusty dagger".into(),
        min_damage: 1,
        max_damage: 4,
        damage_type: DamageType::Piercing,
        critical_range: 19..=20,
        critical_multiplier: 2,
        verbs: AttackVerbs::new("stab", "stabs"),
    }
}

fn teeth() -> Attack {
    Attack {
        name: "teeth".into(),
        min_damage: 1,
        max_damage: 2,
        damage_type: DamageType::Piercing,
        critical_range: 20..=20,
        critical_multiplier: 2,
        verbs: AttackVerbs::new("bite", "bites"),
    }
}

fn crier() -> NpcTemplate {
    NpcTemplate::new("the town crier", 1, 10).with_behavior(BehaviorSpec::Chatty {
        line: "Hear ye! Goblins have been sighted in the warren!".into(),
        every_ticks: 10,
    })
}

fn rat() -> NpcTemplate {
    NpcTemplate::new("a giant rat", 1, 6)
        .with_size(SizeClass::Small)
        .with_attacks(vec![teeth()])
}

fn goblin() -> NpcTemplate {
    let mut goblin = NpcTemplate::new("a goblin scout", 2, 14)
        .with_size(SizeClass::Small)
        .with_attacks(vec![rusty_dagger()])
        .with_behavior(BehaviorSpec::Aggressive);
    goblin.skills.set(Skill::Attack, 20);
    goblin.skills.set(Skill::Backstab, 10);
    goblin.armor.insert(HitLocation::Body, 2);
    goblin
}

fn room(id: u64, name: &str, description: &str, spawners: Vec<SpawnerRecord>) -> RoomRecord {
    RoomRecord {
        id: RoomId(id),
        name: name.into(),
        description: description.into(),
        spawners,
    }
}

/// One small area with a safe square, two hunting grounds and a temple.
pub fn starter_snapshot() -> WorldSnapshot {
    let millbrook = AreaRecord {
        id: AreaId(1),
        name: "Millbrook".into(),
        rooms: vec![
            room(
                1,
                "Town Square",
                "A fountain burbles between market stalls.",
                vec![SpawnerRecord {
                    id: SpawnerId(1),
                    template: crier(),
                    max_population: 1,
                    interval_ticks: 100,
                }],
            ),
            room(
                2,
                "Training Yard",
                "Straw dummies slump against a fence gnawed by rats.",
                vec![SpawnerRecord {
                    id: SpawnerId(2),
                    template: rat(),
                    max_population: 3,
                    interval_ticks: 20,
                }],
            ),
            room(
                3,
                "Goblin Warren",
                "A low tunnel reeking of smoke and wet fur.",
                vec![SpawnerRecord {
                    id: SpawnerId(3),
                    template: goblin(),
                    max_population: 2,
                    interval_ticks: 30,
                }],
            ),
            room(4, "Temple", "Candles flicker before a quiet altar.", Vec::new()),
        ],
    };

    WorldSnapshot {
        meta: WorldMeta {
            tick: SimTick::ZERO,
            next_character_id: 1,
        },
        areas: vec![millbrook],
        characters: Vec::new(),
    }
}
