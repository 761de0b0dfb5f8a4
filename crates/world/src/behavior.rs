//! Non-player AI strategies.

use crate::character::{CharacterAction, TickContext};
use mudsim_core::CharacterId;
use std::fmt;

/// Decides what a non-player character does on its turn.
pub trait Behavior: fmt::Debug + Send {
    /// Pick actions for `me` given the room as it stood before this phase.
    fn decide(&mut self, me: CharacterId, ctx: &TickContext<'_>) -> Vec<CharacterAction>;
}

/// Does nothing unless attacked.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passive;

impl Behavior for Passive {
    fn decide(&mut self, _me: CharacterId, _ctx: &TickContext<'_>) -> Vec<CharacterAction> {
        Vec::new()
    }
}

/// Picks a fight with the first living player in the room.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggressive;

impl Behavior for Aggressive {
    fn decide(&mut self, me: CharacterId, ctx: &TickContext<'_>) -> Vec<CharacterAction> {
        if ctx.target_of(me).is_some() {
            return Vec::new();
        }

        ctx.occupants
            .iter()
            .find(|occupant| occupant.is_player && occupant.alive && occupant.id != me)
            .map(|prey| {
                vec![CharacterAction::Attack {
                    attacker: me,
                    target: prey.id,
                }]
            })
            .unwrap_or_default()
    }
}

/// Says the same line on a fixed cadence.
#[derive(Debug, Clone)]
pub struct Chatty {
    line: String,
    every_ticks: u64,
}

impl Chatty {
    /// Say `line` on every tick divisible by `every_ticks`.
    pub fn new(line: impl Into<String>, every_ticks: u64) -> Self {
        Self {
            line: line.into(),
            every_ticks: every_ticks.max(1),
        }
    }
}

impl Behavior for Chatty {
    fn decide(&mut self, me: CharacterId, ctx: &TickContext<'_>) -> Vec<CharacterAction> {
        if ctx.target_of(me).is_some() || !ctx.tick.is_multiple_of(self.every_ticks) {
            return Vec::new();
        }
        vec![CharacterAction::Say {
            speaker: me,
            text: self.line.clone(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Occupant;
    use mudsim_core::{RoomId, SimTick};

    fn occupant(id: u64, is_player: bool, alive: bool) -> Occupant {
        Occupant {
            id: CharacterId(id),
            name: format!("c{id}"),
            is_player,
            alive,
            target: None,
        }
    }

    fn ctx(tick: u64, occupants: &[Occupant]) -> TickContext<'_> {
        TickContext {
            tick: SimTick(tick),
            room: RoomId(1),
            occupants,
        }
    }

    #[test]
    fn aggressive_targets_first_living_player() {
        let room = [
            occupant(1, false, true),
            occupant(2, true, false),
            occupant(3, true, true),
            occupant(4, true, true),
        ];
        let actions = Aggressive.decide(CharacterId(1), &ctx(1, &room));
        assert_eq!(
            actions,
            vec![CharacterAction::Attack {
                attacker: CharacterId(1),
                target: CharacterId(3),
            }]
        );
    }

    #[test]
    fn aggressive_waits_while_already_fighting() {
        let mut me = occupant(1, false, true);
        me.target = Some(CharacterId(3));
        let room = [me, occupant(3, true, true)];
        assert!(Aggressive.decide(CharacterId(1), &ctx(1, &room)).is_empty());
    }

    #[test]
    fn chatty_speaks_on_its_cadence() {
        let room = [occupant(1, false, true)];
        let mut parrot = Chatty::new("Pieces of eight!", 3);
        assert!(parrot.decide(CharacterId(1), &ctx(2, &room)).is_empty());
        assert_eq!(parrot.decide(CharacterId(1), &ctx(3, &room)).len(), 1);
        assert!(Passive.decide(CharacterId(1), &ctx(3, &room)).is_empty());
    }
}
