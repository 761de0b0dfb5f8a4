//! Shuffled, without-replacement dice.
//!
//! A [`DiceBag`] holds `sets` copies of every face in `[min, max]`. Rolls are
//! drawn from a shuffled active pool and parked in an exhausted pool; when the
//! active pool runs dry the exhausted pool is reshuffled back in. Across one
//! full cycle of `sets * (max - min + 1)` rolls every face comes up exactly
//! `sets` times, which keeps combat streaks bounded.
//!
//! Forced results injected with [`DiceBag::set_next_results`] are consumed
//! before the pools and are never recycled.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::{BTreeMap, VecDeque};

/// A bag of dice faces drawn without replacement.
#[derive(Debug, Clone)]
pub struct DiceBag {
    min: i32,
    max: i32,
    sets: u32,
    forced: VecDeque<i32>,
    active: Vec<i32>,
    exhausted: Vec<i32>,
    rng: StdRng,
}

impl DiceBag {
    /// Create a bag seeded from OS entropy.
    pub fn new(min: i32, max: i32, sets: u32) -> Self {
        Self::with_rng(min, max, sets, StdRng::from_entropy())
    }

    /// Create a bag that shuffles with the supplied RNG.
    pub fn with_rng(min: i32, max: i32, sets: u32, rng: StdRng) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let sets = sets.max(1);

        let mut exhausted = Vec::with_capacity(((max - min + 1) as usize) * sets as usize);
        for _ in 0..sets {
            exhausted.extend(min..=max);
        }

        let mut bag = Self {
            min,
            max,
            sets,
            forced: VecDeque::new(),
            active: Vec::new(),
            exhausted,
            rng,
        };
        bag.refill();
        bag
    }

    /// Draw the next value.
    pub fn roll(&mut self) -> i32 {
        if let Some(value) = self.forced.pop_front() {
            return value;
        }

        if self.active.is_empty() {
            self.refill();
        }

        // The bag always holds at least one full set, so a refill never
        // leaves the active pool empty.
        let value = self.active.pop().unwrap_or(self.min);
        self.exhausted.push(value);
        value
    }

    /// Queue values to be returned, in order, ahead of the shuffled pools.
    ///
    /// New values go in front of any forced values that are still pending.
    pub fn set_next_results(&mut self, values: &[i32]) {
        for &value in values.iter().rev() {
            self.forced.push_front(value);
        }
    }

    /// Lowest face in the bag.
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Highest face in the bag.
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Number of complete face sets loaded.
    pub fn sets(&self) -> u32 {
        self.sets
    }

    /// Number of rolls in one full fairness cycle.
    pub fn cycle_len(&self) -> usize {
        (self.max - self.min + 1) as usize * self.sets as usize
    }

    /// Forced results not yet consumed.
    pub fn pending_forced(&self) -> usize {
        self.forced.len()
    }

    /// Rolls left before the next reshuffle.
    pub fn remaining_in_cycle(&self) -> usize {
        self.active.len()
    }

    /// Face counts across the active and exhausted pools.
    pub fn pool_counts(&self) -> BTreeMap<i32, u32> {
        let mut counts = BTreeMap::new();
        for &value in self.active.iter().chain(self.exhausted.iter()) {
            *counts.entry(value).or_insert(0) += 1;
        }
        counts
    }

    fn refill(&mut self) {
        self.active.append(&mut self.exhausted);
        self.active.shuffle(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seeded(min: i32, max: i32, sets: u32) -> DiceBag {
        DiceBag::with_rng(min, max, sets, StdRng::seed_from_u64(99))
    }

    #[test]
    fn full_cycle_yields_every_face_sets_times() {
        let mut bag = seeded(1, 20, 3);
        let mut counts = BTreeMap::new();
        for _ in 0..bag.cycle_len() {
            *counts.entry(bag.roll()).or_insert(0u32) += 1;
        }

        assert_eq!(counts.len(), 20);
        assert!(counts.values().all(|&count| count == 3));
    }

    #[test]
    fn bag_refills_after_exhaustion() {
        let mut bag = seeded(1, 4, 1);
        for _ in 0..4 {
            bag.roll();
        }
        assert_eq!(bag.remaining_in_cycle(), 0);

        let value = bag.roll();
        assert!((1..=4).contains(&value));
        assert_eq!(bag.remaining_in_cycle(), 3);
    }

    #[test]
    fn forced_results_come_first_and_are_not_recycled() {
        let mut bag = seeded(1, 6, 2);
        bag.set_next_results(&[42, 43, 44]);

        assert_eq!(bag.roll(), 42);
        assert_eq!(bag.roll(), 43);
        assert_eq!(bag.roll(), 44);
        assert_eq!(bag.pending_forced(), 0);

        let counts = bag.pool_counts();
        assert_eq!(counts.len(), 6);
        assert!(counts.values().all(|&count| count == 2));
        assert!(!counts.contains_key(&42));
    }

    #[test]
    fn later_forced_results_jump_the_queue() {
        let mut bag = seeded(1, 6, 1);
        bag.set_next_results(&[5, 5]);
        bag.set_next_results(&[1]);

        assert_eq!(bag.roll(), 1);
        assert_eq!(bag.roll(), 5);
        assert_eq!(bag.roll(), 5);
    }

    #[test]
    fn single_face_bag_always_rolls_that_face() {
        let mut bag = seeded(3, 3, 1);
        for _ in 0..10 {
            assert_eq!(bag.roll(), 3);
        }
    }

    proptest! {
        #[test]
        fn pools_keep_exact_face_counts(
            min in -10i32..10,
            span in 0i32..25,
            sets in 1u32..5,
            draws in 0usize..300,
            seed in any::<u64>(),
        ) {
            let max = min + span;
            let mut bag = DiceBag::with_rng(min, max, sets, StdRng::seed_from_u64(seed));
            for _ in 0..draws {
                let value = bag.roll();
                prop_assert!((min..=max).contains(&value));
            }

            let counts = bag.pool_counts();
            prop_assert_eq!(counts.len(), (span + 1) as usize);
            prop_assert!(counts.values().all(|&count| count == sets));
        }

        #[test]
        fn every_cycle_is_fair(seed in any::<u64>(), cycles in 1usize..4) {
            let mut bag = DiceBag::with_rng(1, 8, 2, StdRng::seed_from_u64(seed));
            for _ in 0..cycles {
                let mut seen: Vec<i32> = (0..bag.cycle_len()).map(|_| bag.roll()).collect();
                seen.sort_unstable();
                let expected: Vec<i32> = (1..=8).flat_map(|face| [face, face]).collect();
                prop_assert_eq!(seen, expected);
            }
        }
    }
}
