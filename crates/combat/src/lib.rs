#![warn(missing_docs)]
//! Round-based melee resolution.
//!
//! A [`Combat`] is one attacker swinging at one defender; a room's
//! [`CombatManager`] resolves every active combat once per tick in
//! initiative order. Characters plug in through [`Combatant`], rooms through
//! [`RoomObserver`], and the room's occupant list through [`Roster`].

mod combat;
mod location;
mod manager;

pub use combat::{Combat, RoundOutcome, ATTACK_DIE_SETS, BASE_DEFENSE};
pub use location::{hit_location, location_table, LocationBand, LOCATION_DIE_SIDES};
pub use manager::{CombatManager, Fatality, Initiative, PassReport};

use mudsim_core::{Attack, Attribute, CharacterId, GameMessage, HitLocation, SizeClass, Skill};
use serde::{Deserialize, Serialize};

/// Result of applying damage to a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Still standing with the given hit points.
    Wounded {
        /// Hit points left.
        remaining: i32,
    },
    /// Hit points reached zero.
    Died,
}

/// What combat needs from a character.
pub trait Combatant {
    /// Stable identity.
    fn id(&self) -> CharacterId;

    /// Display name.
    fn name(&self) -> &str;

    /// Current hit points.
    fn hit_points(&self) -> i32;

    /// Character level, used for kill experience.
    fn level(&self) -> u32;

    /// Size class.
    fn size(&self) -> SizeClass;

    /// Modifier for a primary attribute.
    fn attribute_modifier(&self, attribute: Attribute) -> i32;

    /// Attacks made each round, in order.
    fn attacks(&self) -> &[Attack];

    /// Skill level, zero when untrained.
    fn skill(&self, skill: Skill) -> i32;

    /// Armour class worn over `location`, if any.
    fn armor_at(&self, location: HitLocation) -> Option<i32>;

    /// Subtract hit points, never dropping below zero.
    fn apply_damage(&mut self, amount: i32) -> DamageOutcome;

    /// Award experience for defeating a foe of `level`.
    fn add_experience(&mut self, level: u32);

    /// Record a kill.
    fn add_kill(&mut self, victim: &Self)
    where
        Self: Sized;

    /// Deliver a message straight to this character, bypassing the bus.
    fn send_immediate(&self, message: GameMessage);
}

/// Room-level broadcast used for onlooker narration.
pub trait RoomObserver {
    /// Publish `message` to everybody in the room except `exclude`.
    fn send_immediate(&self, exclude: &[CharacterId], message: GameMessage);
}

/// Lookup of the characters present in a room.
pub trait Roster {
    /// Character type held by the roster.
    type Member: Combatant;

    /// Shared access to one character.
    fn member(&self, id: CharacterId) -> Option<&Self::Member>;

    /// Simultaneous mutable access to two distinct characters.
    fn pair_mut(
        &mut self,
        first: CharacterId,
        second: CharacterId,
    ) -> Option<(&mut Self::Member, &mut Self::Member)>;
}

impl<C: Combatant> Roster for Vec<C> {
    type Member = C;

    fn member(&self, id: CharacterId) -> Option<&C> {
        self.iter().find(|member| member.id() == id)
    }

    fn pair_mut(&mut self, first: CharacterId, second: CharacterId) -> Option<(&mut C, &mut C)> {
        if first == second {
            return None;
        }
        let i = self.iter().position(|member| member.id() == first)?;
        let j = self.iter().position(|member| member.id() == second)?;

        if i < j {
            let (head, tail) = self.split_at_mut(j);
            Some((&mut head[i], &mut tail[0]))
        } else {
            let (head, tail) = self.split_at_mut(i);
            Some((&mut tail[0], &mut head[j]))
        }
    }
}
