//! Population top-up for non-player characters.

use crate::character::Character;
use crate::record::{NpcTemplate, SpawnerRecord};
use mudsim_core::{CharacterId, IdAllocator, SpawnerId};
use std::collections::BTreeSet;
use tracing::debug;

/// Keeps a room stocked with copies of one template.
///
/// The countdown starts at one, so a fresh spawner fills its room on the
/// first tick it sees and then every `interval_ticks` after that.
#[derive(Debug, Clone)]
pub struct Spawner {
    id: SpawnerId,
    template: NpcTemplate,
    max_population: usize,
    interval_ticks: u32,
    countdown: u32,
    live: BTreeSet<CharacterId>,
}

impl Spawner {
    /// Spawner for `template`, topping up to `max_population` every `interval_ticks`.
    pub fn new(id: SpawnerId, template: NpcTemplate, max_population: usize, interval_ticks: u32) -> Self {
        Self {
            id,
            template,
            max_population,
            interval_ticks: interval_ticks.max(1),
            countdown: 1,
            live: BTreeSet::new(),
        }
    }

    /// Rebuild from a saved record.
    pub fn from_record(record: &SpawnerRecord) -> Self {
        Self::new(
            record.id,
            record.template.clone(),
            record.max_population,
            record.interval_ticks,
        )
    }

    /// Save form.
    pub fn to_record(&self) -> SpawnerRecord {
        SpawnerRecord {
            id: self.id,
            template: self.template.clone(),
            max_population: self.max_population,
            interval_ticks: self.interval_ticks,
        }
    }

    /// Stable id.
    pub fn id(&self) -> SpawnerId {
        self.id
    }

    /// Template spawned.
    pub fn template(&self) -> &NpcTemplate {
        &self.template
    }

    /// Characters this spawner has alive right now.
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Ticks until the next top-up.
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Count down; on expiry, return the characters needed to reach full population.
    ///
    /// The caller places them in the room after every spawner has run.
    pub fn on_tick(&mut self, ids: &IdAllocator) -> Vec<Character> {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return Vec::new();
        }
        self.countdown = self.interval_ticks;

        let missing = self.max_population.saturating_sub(self.live.len());
        let spawned: Vec<Character> = (0..missing)
            .map(|_| {
                let id = ids.next_character();
                self.live.insert(id);
                Character::from_template(id, &self.template, Some(self.id))
            })
            .collect();

        if !spawned.is_empty() {
            debug!(spawner = %self.id, count = spawned.len(), name = %self.template.name, "spawned");
        }
        spawned
    }

    /// Forget a character that died or left; false if it was not ours.
    pub fn release(&mut self, character: CharacterId) -> bool {
        self.live.remove(&character)
    }
}
