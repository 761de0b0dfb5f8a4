//! Scheduler Worldtest
//!
//! Runs the server on paused tokio time and checks:
//! - ticks fire once per interval and never overlap
//! - save ticks hand snapshots to the store off the tick
//! - a failing store does not stop the clock
//! - shutdown stops the clock and performs a final save

use mudsim_core::{CharacterId, SimTick};
use mudsim_server::{Server, ServerSettings};
use mudsim_world::{
    CharacterRecord, MemoryStore, StoreError, WorldSnapshot, WorldStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const TICK: Duration = Duration::from_millis(100);

fn settings(save_every_ticks: u64, max_ticks: Option<u64>) -> ServerSettings {
    let mut settings = ServerSettings {
        tick_interval: TICK,
        max_ticks,
        ..ServerSettings::default()
    };
    settings.world.save_every_ticks = save_every_ticks;
    settings.world.seed = Some(7);
    settings
}

#[derive(Debug, Default)]
struct BrokenStore {
    attempts: AtomicUsize,
}

impl WorldStore for BrokenStore {
    fn load_snapshot(&self) -> Result<Option<WorldSnapshot>, StoreError> {
        Ok(None)
    }

    fn save_snapshot(&self, _snapshot: &WorldSnapshot) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Missing("disk on fire".into()))
    }

    fn load_character(&self, _id: CharacterId) -> Result<Option<CharacterRecord>, StoreError> {
        Ok(None)
    }

    fn find_character(&self, _name: &str) -> Result<Option<CharacterRecord>, StoreError> {
        Ok(None)
    }

    fn save_character(&self, _record: &CharacterRecord) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn ticks_follow_the_interval() {
    let store = Arc::new(MemoryStore::new());
    let server = Server::load(settings(0, None), store).expect("server");
    server.start().expect("start");

    sleep(Duration::from_millis(350)).await;
    assert_eq!(server.tick().await, SimTick(3));

    sleep(Duration::from_millis(200)).await;
    assert_eq!(server.tick().await, SimTick(5));

    server.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn starting_twice_is_refused() {
    let server = Server::load(settings(0, None), Arc::new(MemoryStore::new())).expect("server");
    server.start().expect("first start");
    assert!(server.start().is_err());
    server.shutdown().await.expect("shutdown");
    assert!(server.start().is_err());
}

#[tokio::test(start_paused = true)]
async fn tick_limit_stops_the_clock_after_saving() {
    let store = Arc::new(MemoryStore::new());
    let server = Server::load(settings(2, Some(5)), store.clone()).expect("server");
    server.start().expect("start");

    server.finished().await;
    assert_eq!(server.tick().await, SimTick(5));
    assert_eq!(store.snapshots_saved(), 2);
    assert_eq!(store.saved_tick(), Some(SimTick(4)));

    sleep(TICK * 3).await;
    assert_eq!(server.tick().await, SimTick(5));
    server.shutdown().await.expect("shutdown");
    assert_eq!(store.saved_tick(), Some(SimTick(5)));
}

#[tokio::test(start_paused = true)]
async fn failing_saves_do_not_stop_the_clock() {
    let store = Arc::new(BrokenStore::default());
    let server = Server::load(settings(1, Some(4)), store.clone()).expect("server");
    server.start().expect("start");

    server.finished().await;
    assert_eq!(server.tick().await, SimTick(4));
    assert!(store.attempts.load(Ordering::SeqCst) >= 1);

    // The final save fails too, and says so.
    assert!(server.shutdown().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_ticking_and_saves_the_world() {
    let store = Arc::new(MemoryStore::new());
    let server = Server::load(settings(0, None), store.clone()).expect("server");
    server.start().expect("start");

    sleep(Duration::from_millis(250)).await;
    server.shutdown().await.expect("shutdown");
    let stopped_at = server.tick().await;
    assert_eq!(stopped_at, SimTick(2));
    assert!(server.bus().is_shut_down());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(server.tick().await, stopped_at);
    assert_eq!(store.saved_tick(), Some(stopped_at));

    // Idempotent.
    server.shutdown().await.expect("second shutdown");
    server.finished().await;
}

#[tokio::test(start_paused = true)]
async fn restarts_resume_from_the_saved_tick() {
    let store = Arc::new(MemoryStore::new());
    let first = Server::load(settings(0, Some(3)), store.clone()).expect("server");
    first.start().expect("start");
    first.finished().await;
    first.shutdown().await.expect("shutdown");

    let second = Server::load(settings(0, Some(2)), store.clone()).expect("reload");
    assert_eq!(second.tick().await, SimTick(3));
    second.start().expect("start");
    second.finished().await;
    assert_eq!(second.tick().await, SimTick(5));
    second.shutdown().await.expect("shutdown");
}
