//! Per-room combat bookkeeping and initiative ordering.

use crate::combat::{Combat, RoundOutcome};
use crate::{Combatant, Roster, RoomObserver};
use mudsim_core::{scoped_rng, Attribute, CharacterId, DiceBag};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const INITIATIVE_DIE_SETS: u32 = 3;

#[derive(Debug, Clone)]
struct Engagement {
    combat: Combat,
    registered: u64,
}

/// Initiative rolled for one attacker in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Initiative {
    /// Acting character.
    pub attacker: CharacterId,
    /// d20 plus dexterity modifier.
    pub score: i32,
}

/// A character that went down during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fatality {
    /// Who died.
    pub victim: CharacterId,
    /// Who landed the killing blow, when it happened in this pass.
    pub killer: Option<CharacterId>,
}

/// What happened during one [`CombatManager::process_round`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Initiative order used for the pass, first to act first.
    pub order: Vec<Initiative>,
    /// Rounds actually resolved, in the order they ran.
    pub resolved: Vec<(CharacterId, RoundOutcome)>,
    /// Deaths, at most one entry per victim.
    pub fatalities: Vec<Fatality>,
}

/// Every active combat in one room, keyed by attacker.
#[derive(Debug)]
pub struct CombatManager {
    combats: BTreeMap<CharacterId, Engagement>,
    next_registration: u64,
    initiative_dice: DiceBag,
    seed: Option<u64>,
}

impl Default for CombatManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatManager {
    /// Manager whose dice draw from OS entropy.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Manager whose initiative and per-combat dice are reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self::build(Some(seed))
    }

    fn build(seed: Option<u64>) -> Self {
        Self {
            combats: BTreeMap::new(),
            next_registration: 0,
            initiative_dice: DiceBag::with_rng(1, 20, INITIATIVE_DIE_SETS, scoped_rng(seed, 0)),
            seed,
        }
    }

    /// Start `attacker` fighting `defender`.
    ///
    /// Returns false (and changes nothing) if the attacker is already
    /// engaged or tries to fight itself.
    pub fn engage(&mut self, attacker: CharacterId, defender: CharacterId) -> bool {
        if attacker == defender || self.combats.contains_key(&attacker) {
            return false;
        }

        let registered = self.next_registration;
        self.next_registration += 1;
        let combat = match self.seed {
            Some(seed) => Combat::seeded(attacker, defender, seed ^ (registered.wrapping_add(1) << 8)),
            None => Combat::new(attacker, defender),
        };
        self.combats.insert(attacker, Engagement { combat, registered });
        debug!(attacker = %attacker, defender = %defender, "combat engaged");
        true
    }

    /// Start combat in both directions; true if either entry was new.
    pub fn engage_mutual(&mut self, first: CharacterId, second: CharacterId) -> bool {
        let forward = self.engage(first, second);
        let backward = self.engage(second, first);
        forward || backward
    }

    /// Remove the combat `attacker` is driving.
    pub fn disengage(&mut self, attacker: CharacterId) -> Option<Combat> {
        self.combats.remove(&attacker).map(|engagement| engagement.combat)
    }

    /// Remove every combat `character` takes part in; returns how many went.
    pub fn end_combats_involving(&mut self, character: CharacterId) -> usize {
        let before = self.combats.len();
        self.combats.retain(|&attacker, engagement| {
            attacker != character && engagement.combat.defender() != character
        });
        before - self.combats.len()
    }

    /// Whether `character` is attacking or being attacked.
    pub fn is_engaged(&self, character: CharacterId) -> bool {
        self.combats.contains_key(&character)
            || self
                .combats
                .values()
                .any(|engagement| engagement.combat.defender() == character)
    }

    /// Combat driven by `attacker`.
    pub fn combat(&self, attacker: CharacterId) -> Option<&Combat> {
        self.combats.get(&attacker).map(|engagement| &engagement.combat)
    }

    /// Mutable combat driven by `attacker`, e.g. to force its next roll.
    pub fn combat_mut(&mut self, attacker: CharacterId) -> Option<&mut Combat> {
        self.combats
            .get_mut(&attacker)
            .map(|engagement| &mut engagement.combat)
    }

    /// Attackers in registration order.
    pub fn attackers(&self) -> Vec<CharacterId> {
        let mut engaged: Vec<&Engagement> = self.combats.values().collect();
        engaged.sort_by_key(|engagement| engagement.registered);
        engaged
            .into_iter()
            .map(|engagement| engagement.combat.attacker())
            .collect()
    }

    /// Number of active combats.
    pub fn len(&self) -> usize {
        self.combats.len()
    }

    /// True when nobody is fighting.
    pub fn is_empty(&self) -> bool {
        self.combats.is_empty()
    }

    /// Force upcoming initiative d20 rolls, consumed in registration order.
    pub fn set_next_initiative_rolls(&mut self, rolls: &[i32]) {
        self.initiative_dice.set_next_results(rolls);
    }

    /// Resolve one round for every active combat, highest initiative first.
    ///
    /// The order is fixed before anyone acts. A death removes every combat
    /// the dead character takes part in, so later entries for it are skipped.
    pub fn process_round<R, O>(&mut self, roster: &mut R, room: &O) -> PassReport
    where
        R: Roster + ?Sized,
        O: RoomObserver + ?Sized,
    {
        let mut report = PassReport {
            order: self.roll_initiative(roster),
            ..PassReport::default()
        };
        let order: Vec<CharacterId> = report.order.iter().map(|entry| entry.attacker).collect();

        for attacker_id in order {
            let Some(engagement) = self.combats.get_mut(&attacker_id) else {
                continue;
            };
            let defender_id = engagement.combat.defender();

            let Some((attacker, defender)) = roster.pair_mut(attacker_id, defender_id) else {
                warn!(
                    attacker = %attacker_id,
                    defender = %defender_id,
                    "combatant no longer present; ending combat"
                );
                self.combats.remove(&attacker_id);
                continue;
            };

            let outcome = engagement.combat.process_round(attacker, defender, room);
            report.resolved.push((attacker_id, outcome));

            let fatality = match outcome {
                RoundOutcome::Continue => continue,
                RoundOutcome::AttackerDead => Fatality {
                    victim: attacker_id,
                    killer: None,
                },
                RoundOutcome::DefenderDead => Fatality {
                    victim: defender_id,
                    killer: Some(attacker_id),
                },
            };

            let ended = self.end_combats_involving(fatality.victim);
            debug!(victim = %fatality.victim, ended, "combatant down");
            if !report
                .fatalities
                .iter()
                .any(|existing| existing.victim == fatality.victim)
            {
                report.fatalities.push(fatality);
            }
        }

        report
    }

    fn roll_initiative<R: Roster + ?Sized>(&mut self, roster: &R) -> Vec<Initiative> {
        let mut order = Vec::with_capacity(self.combats.len());
        let mut missing = Vec::new();

        for attacker in self.attackers() {
            match roster.member(attacker) {
                Some(member) => order.push(Initiative {
                    attacker,
                    score: self.initiative_dice.roll() + member.attribute_modifier(Attribute::Dexterity),
                }),
                None => missing.push(attacker),
            }
        }

        for attacker in missing {
            warn!(attacker = %attacker, "attacker not in room; ending combat");
            self.combats.remove(&attacker);
        }

        // Stable: equal scores keep registration order.
        order.sort_by(|a, b| b.score.cmp(&a.score));
        order
    }
}
