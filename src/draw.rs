//! Draw order generation
//!
//! Every round draws from a fresh, uniformly shuffled permutation of
//! `1..=MAX_NUMBER`. The source is a seam so tests can script the order.

use crate::common::types::MAX_NUMBER;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::sync::Mutex;

/// Produces the full draw order for one round
pub trait DrawSource: Send + Sync {
    fn sequence(&self) -> Vec<u8>;
}

/// Fisher-Yates shuffle of the full number range
pub struct ShuffledDraw {
    seeded: Option<Mutex<StdRng>>,
}

impl ShuffledDraw {
    /// Shuffle with the thread-local OS-seeded generator
    pub fn new() -> Self {
        Self { seeded: None }
    }

    /// Reproducible shuffles from a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seeded: Some(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Default for ShuffledDraw {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSource for ShuffledDraw {
    fn sequence(&self) -> Vec<u8> {
        let mut numbers: Vec<u8> = (1..=MAX_NUMBER).collect();
        match &self.seeded {
            Some(rng) => match rng.lock() {
                Ok(mut rng) => numbers.shuffle(&mut *rng),
                Err(poisoned) => numbers.shuffle(&mut *poisoned.into_inner()),
            },
            None => numbers.shuffle(&mut rand::thread_rng()),
        }
        numbers
    }
}

/// Scripted order: the given numbers first, then the rest of the range ascending
pub struct FixedDraw {
    order: Vec<u8>,
}

impl FixedDraw {
    pub fn new(prefix: Vec<u8>) -> Self {
        let mut order = Vec::with_capacity(MAX_NUMBER as usize);
        for n in prefix.into_iter().chain(1..=MAX_NUMBER) {
            if (1..=MAX_NUMBER).contains(&n) && !order.contains(&n) {
                order.push(n);
            }
        }
        Self { order }
    }
}

impl DrawSource for FixedDraw {
    fn sequence(&self) -> Vec<u8> {
        self.order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_permutation(seq: &[u8]) {
        assert_eq!(seq.len(), MAX_NUMBER as usize);
        let unique: HashSet<_> = seq.iter().copied().collect();
        assert_eq!(unique.len(), MAX_NUMBER as usize);
        assert!(seq.iter().all(|n| (1..=MAX_NUMBER).contains(n)));
    }

    #[test]
    fn test_shuffle_is_permutation() {
        assert_permutation(&ShuffledDraw::new().sequence());
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let a = ShuffledDraw::with_seed(42).sequence();
        let b = ShuffledDraw::with_seed(42).sequence();
        assert_eq!(a, b);
        assert_permutation(&a);
    }

    #[test]
    fn test_fixed_draw_prefix_then_rest() {
        let seq = FixedDraw::new(vec![75, 3, 3, 0, 99]).sequence();
        assert_permutation(&seq);
        assert_eq!(&seq[..3], &[75, 3, 1]);
    }
}
