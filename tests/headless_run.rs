use mudsim_core::{RoomId, SimTick};
use mudsim_server::{Server, ServerSettings};
use mudsim_testkit::{EventRecord, JsonlSink};
use mudsim_world::{FileStore, WorldStore};
use std::sync::Arc;
use std::time::Duration;

const YARD: RoomId = RoomId(2);

fn headless(seed: u64, max_ticks: u64) -> ServerSettings {
    let mut settings = ServerSettings {
        tick_interval: Duration::from_millis(50),
        max_ticks: Some(max_ticks),
        ..ServerSettings::default()
    };
    settings.world.save_every_ticks = 10;
    settings.world.seed = Some(seed);
    settings
}

#[tokio::test(start_paused = true)]
async fn headless_run_logs_events_and_persists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FileStore::new(dir.path().join("world")).expect("store"));
    let server = Server::load(headless(1337, 25), store.clone()).expect("server");

    let mut aria = server.connect("Aria").await.expect("connect");
    server.move_character(aria.id, YARD).await.expect("move");
    server.start().expect("start");
    server.finished().await;
    server.shutdown().await.expect("shutdown");

    let mut sink = JsonlSink::create(dir.path().join("events/aria.jsonl")).expect("sink");
    let mut lines = 0;
    while let Ok(message) = aria.messages.try_recv() {
        sink.write(&EventRecord::new(SimTick(25), "room:2", &message))
            .expect("write");
        lines += 1;
    }
    // Room description plus the rats showing up.
    assert!(lines >= 2);
    let log = std::fs::read_to_string(dir.path().join("events/aria.jsonl")).expect("log");
    assert_eq!(log.lines().count(), lines);
    assert!(log.contains("appears."));

    let snapshot = store.load_snapshot().expect("load").expect("saved");
    assert_eq!(snapshot.meta.tick, SimTick(25));
    let saved = store.find_character("Aria").expect("lookup").expect("aria");
    assert_eq!(saved.room, Some(YARD));

    let resumed = Server::load(headless(1337, 5), store).expect("resume");
    assert_eq!(resumed.tick().await, SimTick(25));
}
