#![warn(missing_docs)]
//! Game host: owns the world, drives its tick on a timer, persists it and
//! manages player sessions.
//!
//! Two timers run side by side on the tokio runtime: the world tick task
//! spawned by [`Server::start`] and the message bus drain task. Snapshot
//! writes are handed to blocking tasks so a slow disk never stretches a tick.

mod content;

pub use content::{starter_snapshot, STARTER_SQUARE, STARTER_TEMPLE};

use anyhow::{bail, Context, Result};
use mudsim_bus::MessageBus;
use mudsim_core::{CharacterId, GameMessage, RoomId, SimTick};
use mudsim_world::{
    CharacterAction, CharacterRecord, RoomMessage, TickReport, World, WorldSettings, WorldSnapshot,
    WorldStore,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Host-level knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Wall-clock time between world ticks.
    pub tick_interval: Duration,
    /// How often the bus drain task delivers queued room messages.
    pub bus_poll_interval: Duration,
    /// Stop ticking after this many ticks.
    pub max_ticks: Option<u64>,
    /// Passed through to the [`World`].
    pub world: WorldSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(3000),
            bus_poll_interval: Duration::from_millis(10),
            max_ticks: None,
            world: WorldSettings {
                start_room: STARTER_SQUARE,
                respawn_room: STARTER_TEMPLE,
                ..WorldSettings::default()
            },
        }
    }
}

/// A connected player as seen by the transport layer.
#[derive(Debug)]
pub struct PlayerHandle {
    /// Character driven by this connection.
    pub id: CharacterId,
    /// Room the character entered.
    pub room: RoomId,
    /// Everything the game says to this player.
    pub messages: UnboundedReceiver<GameMessage>,
}

/// The running game.
pub struct Server {
    settings: ServerSettings,
    world: Arc<Mutex<World>>,
    bus: MessageBus<RoomMessage>,
    store: Arc<dyn WorldStore>,
    stopping: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    ticker: std::sync::Mutex<Option<JoinHandle<()>>>,
    finished: watch::Receiver<bool>,
    finished_tx: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("settings", &self.settings)
            .field("stopping", &self.stopping.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Restore the world from `store`, or build the starter world when the
    /// store holds nothing yet.
    pub fn load(settings: ServerSettings, store: Arc<dyn WorldStore>) -> Result<Self> {
        let snapshot = match store.load_snapshot().context("Failed to load world snapshot")? {
            Some(snapshot) => snapshot,
            None => {
                info!("no saved world found, using starter content");
                starter_snapshot()
            }
        };
        Self::from_snapshot(settings, store, &snapshot)
    }

    /// Build a server around an explicit snapshot.
    pub fn from_snapshot(
        settings: ServerSettings,
        store: Arc<dyn WorldStore>,
        snapshot: &WorldSnapshot,
    ) -> Result<Self> {
        let bus = MessageBus::new(settings.bus_poll_interval);
        let world = World::from_snapshot(settings.world, bus.clone(), snapshot)
            .context("Failed to rebuild world from snapshot")?;
        if world.room(settings.world.start_room).is_none() {
            bail!("start room {} does not exist", settings.world.start_room);
        }
        if world.room(settings.world.respawn_room).is_none() {
            warn!(
                room = %settings.world.respawn_room,
                "respawn room does not exist, players will revive where they fell"
            );
        }

        let (stop_tx, _) = watch::channel(false);
        let (finished_tx, finished) = watch::channel(false);
        Ok(Self {
            settings,
            world: Arc::new(Mutex::new(world)),
            bus,
            store,
            stopping: Arc::new(AtomicBool::new(false)),
            stop_tx,
            ticker: std::sync::Mutex::new(None),
            finished,
            finished_tx: Arc::new(finished_tx),
        })
    }

    /// Host settings.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Shared world handle.
    pub fn world(&self) -> Arc<Mutex<World>> {
        Arc::clone(&self.world)
    }

    /// The room message bus.
    pub fn bus(&self) -> &MessageBus<RoomMessage> {
        &self.bus
    }

    /// Current world tick.
    pub async fn tick(&self) -> SimTick {
        self.world.lock().await.tick()
    }

    /// Start the bus drain task and the world tick task.
    pub fn start(&self) -> Result<()> {
        if self.stopping.load(Ordering::Acquire) {
            bail!("server has been shut down");
        }
        let mut ticker = self.ticker.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if ticker.is_some() {
            bail!("server already started");
        }

        self.bus.start().context("Failed to start message bus")?;
        *ticker = Some(tokio::spawn(run_ticker(
            Arc::clone(&self.world),
            Arc::clone(&self.store),
            Arc::clone(&self.stopping),
            self.stop_tx.subscribe(),
            Arc::clone(&self.finished_tx),
            self.settings.tick_interval,
            self.settings.max_ticks,
        )));

        info!(
            tick_ms = self.settings.tick_interval.as_millis() as u64,
            max_ticks = ?self.settings.max_ticks,
            "server started"
        );
        Ok(())
    }

    /// Resolves once the tick task has stopped on its own (`max_ticks`).
    pub async fn finished(&self) {
        let mut finished = self.finished.clone();
        // The sender lives in `self`, so this only errors if it is dropped.
        let _ = finished.wait_for(|done| *done).await;
    }

    /// Bring a player online: reuse a saved character with this name or
    /// create a new one.
    #[instrument(skip(self))]
    pub async fn connect(&self, name: &str) -> Result<PlayerHandle> {
        let store = Arc::clone(&self.store);
        let lookup = name.to_string();
        let saved = tokio::task::spawn_blocking(move || store.find_character(&lookup))
            .await
            .context("Character lookup task failed")?
            .with_context(|| format!("Failed to look up character {name}"))?;

        let mut world = self.world.lock().await;
        let record = match saved {
            Some(record) => {
                world.ids().observe(record.id);
                record
            }
            None => {
                let id = world.ids().next_character();
                info!(%id, "creating new character");
                CharacterRecord::new_player(id, name)
            }
        };

        let id = record.id;
        let (session, messages) = unbounded_channel();
        let room = world.attach(record, session)?;
        info!(%id, %room, online = world.players_online(), "player connected");
        Ok(PlayerHandle { id, room, messages })
    }

    /// Take a player offline and save their character.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, id: CharacterId) -> Result<()> {
        let record = self.world.lock().await.detach(id)?;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.save_character(&record))
            .await
            .context("Character save task failed")?
            .with_context(|| format!("Failed to save character {id}"))?;
        info!(%id, "player disconnected");
        Ok(())
    }

    /// Queue a player command for immediate resolution.
    pub async fn perform(&self, action: CharacterAction) -> Result<bool> {
        Ok(self.world.lock().await.perform(action)?)
    }

    /// Move a player between rooms.
    pub async fn move_character(&self, id: CharacterId, to: RoomId) -> Result<()> {
        Ok(self.world.lock().await.move_character(id, to)?)
    }

    /// Stop ticking, save everyone and close the bus.
    ///
    /// A tick that is already running completes first; no tick starts after
    /// this returns.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.stop_tx.send_replace(true);
        let ticker = self
            .ticker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(ticker) = ticker {
            if let Err(err) = ticker.await {
                warn!(%err, "tick task ended abnormally");
            }
        }

        let mut world = self.world.lock().await;

        let online = world.online_players();
        let mut records = Vec::with_capacity(online.len());
        for id in online {
            match world.detach(id) {
                Ok(record) => records.push(record),
                Err(err) => warn!(%id, %err, "could not detach player during shutdown"),
            }
        }
        let snapshot = world.snapshot();
        let tick = world.tick();
        drop(world);

        let store = Arc::clone(&self.store);
        let saved = tokio::task::spawn_blocking(move || -> Result<()> {
            for record in &records {
                store.save_character(record)?;
            }
            store.save_snapshot(&snapshot)?;
            Ok(())
        })
        .await
        .context("Final save task failed")
        .and_then(|result| result.context("Failed to save world on shutdown"));
        if let Err(err) = &saved {
            error!(tick = tick.0, "{err:#}");
        }

        let report = self.bus.shutdown();
        self.finished_tx.send_replace(true);
        info!(
            tick = tick.0,
            delivered = report.delivered,
            dropped = report.dropped,
            "server stopped"
        );
        saved
    }
}

async fn run_ticker(
    world: Arc<Mutex<World>>,
    store: Arc<dyn WorldStore>,
    stopping: Arc<AtomicBool>,
    mut stop: watch::Receiver<bool>,
    finished: Arc<watch::Sender<bool>>,
    period: Duration,
    max_ticks: Option<u64>,
) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the world advances one period later.
    timer.tick().await;

    let mut pending_save: Option<JoinHandle<()>> = None;
    let mut ticks_run = 0u64;
    loop {
        tokio::select! {
            _ = timer.tick() => {}
            _ = stop.changed() => break,
        }
        let Some(report) = tick_once(&world, &stopping).await else {
            break;
        };
        ticks_run += 1;

        if let Some(snapshot) = report.snapshot {
            if pending_save.as_ref().is_some_and(|save| !save.is_finished()) {
                warn!(tick = report.tick.0, "previous save still running, skipping this one");
            } else {
                pending_save = Some(dispatch_save(Arc::clone(&store), snapshot));
            }
        }

        if max_ticks.is_some_and(|max| ticks_run >= max) {
            info!(ticks = ticks_run, "tick limit reached");
            break;
        }
    }

    if let Some(save) = pending_save {
        if let Err(err) = save.await {
            warn!(%err, "save task ended abnormally");
        }
    }
    finished.send_replace(true);
}

/// Run one world tick unless shutdown has begun.
#[instrument(skip_all)]
async fn tick_once(world: &Mutex<World>, stopping: &AtomicBool) -> Option<TickReport> {
    let mut world = world.lock().await;
    if stopping.load(Ordering::Acquire) {
        return None;
    }
    let report = world.on_tick();
    if !report.events.is_empty() {
        debug!(tick = report.tick.0, events = ?report.events, "tick events");
    }
    Some(report)
}

fn dispatch_save(store: Arc<dyn WorldStore>, snapshot: WorldSnapshot) -> JoinHandle<()> {
    tokio::spawn(async move {
        let tick = snapshot.meta.tick;
        match tokio::task::spawn_blocking(move || store.save_snapshot(&snapshot)).await {
            Ok(Ok(())) => debug!(tick = tick.0, "world saved"),
            Ok(Err(err)) => error!(tick = tick.0, %err, "world save failed"),
            Err(err) => error!(tick = tick.0, %err, "world save task panicked"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudsim_world::MemoryStore;

    #[test]
    fn default_settings_point_at_starter_rooms() {
        let settings = ServerSettings::default();
        assert_eq!(settings.world.start_room, STARTER_SQUARE);
        assert_eq!(settings.world.respawn_room, STARTER_TEMPLE);
        assert_eq!(settings.tick_interval, Duration::from_secs(3));
    }

    #[test]
    fn missing_start_room_is_rejected() {
        let mut settings = ServerSettings::default();
        settings.world.start_room = RoomId(99);
        let store: Arc<dyn WorldStore> = Arc::new(MemoryStore::new());
        assert!(Server::load(settings, store).is_err());
    }
}
