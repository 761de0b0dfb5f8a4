//! Hit-location tables.
//!
//! Each size-difference bucket maps a d100 roll onto a body part through
//! cumulative percentile bands. Equal sizes favour centre mass, a smaller
//! attacker reaches the extremities, a larger one the head and neck. The
//! "much larger" bucket never reaches feet or legs.

use mudsim_core::HitLocation::{self, *};
use tracing::warn;

/// Faces on the location die.
pub const LOCATION_DIE_SIDES: i32 = 100;

/// Rolls up to and including `upto` land on `location`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationBand {
    /// Inclusive upper bound of the band.
    pub upto: i32,
    /// Body part for the band.
    pub location: HitLocation,
}

const fn band(upto: i32, location: HitLocation) -> LocationBand {
    LocationBand { upto, location }
}

// Attacker two or more size classes smaller.
const MUCH_SMALLER: [LocationBand; 8] = [
    band(20, Feet),
    band(50, Legs),
    band(70, Body),
    band(75, Back),
    band(85, Arms),
    band(95, Hands),
    band(98, Neck),
    band(100, Head),
];

const SMALLER: [LocationBand; 8] = [
    band(10, Feet),
    band(35, Legs),
    band(65, Body),
    band(70, Back),
    band(82, Arms),
    band(92, Hands),
    band(96, Neck),
    band(100, Head),
];

const SAME: [LocationBand; 8] = [
    band(5, Feet),
    band(20, Legs),
    band(60, Body),
    band(68, Back),
    band(80, Arms),
    band(88, Hands),
    band(93, Neck),
    band(100, Head),
];

const LARGER: [LocationBand; 8] = [
    band(3, Feet),
    band(12, Legs),
    band(50, Body),
    band(60, Back),
    band(72, Arms),
    band(80, Hands),
    band(88, Neck),
    band(100, Head),
];

const MUCH_LARGER: [LocationBand; 6] = [
    band(35, Body),
    band(50, Back),
    band(62, Arms),
    band(70, Hands),
    band(82, Neck),
    band(100, Head),
];

/// Band table for an `attacker - defender` size difference.
pub fn location_table(size_difference: i32) -> &'static [LocationBand] {
    match size_difference {
        i32::MIN..=-2 => &MUCH_SMALLER,
        -1 => &SMALLER,
        0 => &SAME,
        1 => &LARGER,
        _ => &MUCH_LARGER,
    }
}

/// Resolve a d100 roll into a body part.
///
/// A roll no band covers is a table bug; it is logged and lands on the body.
pub fn hit_location(size_difference: i32, roll: i32) -> HitLocation {
    if (1..=LOCATION_DIE_SIDES).contains(&roll) {
        if let Some(found) = location_table(size_difference)
            .iter()
            .find(|band| roll <= band.upto)
        {
            return found.location;
        }
    }

    warn!(size_difference, roll, "no hit-location band matched; defaulting to body");
    Body
}
