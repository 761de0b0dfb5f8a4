//! Ready-made worlds and player sessions for scenario tests.

use anyhow::Result;
use mudsim_bus::MessageBus;
use mudsim_core::{AreaId, CharacterId, GameMessage, RoomId, SimTick, SpawnerId};
use mudsim_world::{
    AreaRecord, BehaviorSpec, CharacterRecord, NpcTemplate, RoomMessage, RoomRecord, Session,
    SpawnerRecord, World, WorldMeta, WorldSettings, WorldSnapshot,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Where new players appear.
pub const SQUARE: RoomId = RoomId(1);
/// Where fixture spawners live.
pub const ARENA: RoomId = RoomId(2);
/// Where dead players wake up.
pub const TEMPLE: RoomId = RoomId(3);

/// Save interval used by [`test_world`].
pub const TEST_SAVE_EVERY: u64 = 5;

/// Bus with the default poll interval and no drain task.
pub fn test_bus() -> MessageBus<RoomMessage> {
    MessageBus::default()
}

/// Level-two goblin that attacks players on sight.
pub fn goblin_template() -> NpcTemplate {
    NpcTemplate::new("goblin", 2, 12).with_behavior(BehaviorSpec::Aggressive)
}

/// Spawner record for the arena.
pub fn arena_spawner(id: u64, template: NpcTemplate, max_population: usize, interval_ticks: u32) -> SpawnerRecord {
    SpawnerRecord {
        id: SpawnerId(id),
        template,
        max_population,
        interval_ticks,
    }
}

/// One area: square, arena (holding `spawners`) and temple.
pub fn village_area(spawners: Vec<SpawnerRecord>) -> AreaRecord {
    AreaRecord {
        id: AreaId(1),
        name: "Millbrook".into(),
        rooms: vec![
            RoomRecord {
                id: SQUARE,
                name: "Town Square".into(),
                description: "A fountain burbles between market stalls.".into(),
                spawners: Vec::new(),
            },
            RoomRecord {
                id: ARENA,
                name: "Arena".into(),
                description: "Sand, blood and a cheering crowd.".into(),
                spawners,
            },
            RoomRecord {
                id: TEMPLE,
                name: "Temple".into(),
                description: "Candles flicker before a quiet altar.".into(),
                spawners: Vec::new(),
            },
        ],
    }
}

/// Fresh snapshot of the village at tick zero.
pub fn village_snapshot(spawners: Vec<SpawnerRecord>) -> WorldSnapshot {
    WorldSnapshot {
        meta: WorldMeta {
            tick: SimTick::ZERO,
            next_character_id: 1000,
        },
        areas: vec![village_area(spawners)],
        characters: Vec::new(),
    }
}

/// Settings matching the village layout.
pub fn test_settings(seed: u64) -> WorldSettings {
    WorldSettings {
        save_every_ticks: TEST_SAVE_EVERY,
        start_room: SQUARE,
        respawn_room: TEMPLE,
        seed: Some(seed),
    }
}

/// Seeded village world on its own bus.
pub fn test_world(seed: u64, spawners: Vec<SpawnerRecord>) -> Result<World> {
    let world = World::from_snapshot(test_settings(seed), test_bus(), &village_snapshot(spawners))?;
    Ok(world)
}

/// Receiving end of a player session.
#[derive(Debug)]
pub struct SessionProbe {
    rx: UnboundedReceiver<GameMessage>,
}

impl SessionProbe {
    /// Connected session/probe pair.
    pub fn channel() -> (Session, Self) {
        let (tx, rx) = unbounded_channel();
        (tx, Self { rx })
    }

    /// Everything received so far.
    pub fn drain(&mut self) -> Vec<GameMessage> {
        let mut received = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            received.push(message);
        }
        received
    }

    /// Texts of everything received so far.
    pub fn texts(&mut self) -> Vec<String> {
        self.drain().into_iter().map(|message| message.text).collect()
    }
}

/// Attach a brand-new player and return its probe.
pub fn join(world: &mut World, id: u64, name: &str) -> Result<SessionProbe> {
    join_with(world, CharacterRecord::new_player(CharacterId(id), name))
}

/// Attach a prepared record and return its probe.
pub fn join_with(world: &mut World, record: CharacterRecord) -> Result<SessionProbe> {
    let (session, probe) = SessionProbe::channel();
    world.attach(record, session)?;
    Ok(probe)
}
