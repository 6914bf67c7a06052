//! Selection among equivalent phrasings (welcome lines, fallback questions).

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Picks one index out of `len` options.
pub trait PhrasingStrategy: Send + Sync {
    /// Returns a value in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

/// Pick one option with `strategy`. Out-of-range picks wrap around.
pub fn choose<'a>(strategy: &dyn PhrasingStrategy, options: &[&'a str]) -> &'a str {
    match options.len() {
        0 => "",
        len => options[strategy.pick(len) % len],
    }
}

/// Deterministic round-robin: 0, 1, 2, … modulo `len`.
#[derive(Debug, Default)]
pub struct Rotating {
    next: AtomicUsize,
}

impl Rotating {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PhrasingStrategy for Rotating {
    fn pick(&self, len: usize) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % len.max(1)
    }
}

/// Uniform random choice from a seedable generator.
pub struct Seeded {
    rng: Mutex<StdRng>,
}

impl Seeded {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }
}

impl PhrasingStrategy for Seeded {
    fn pick(&self, len: usize) -> usize {
        self.rng.lock().gen_range(0..len.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotating_cycles() {
        let rotating = Rotating::new();
        let picks: Vec<usize> = (0..5).map(|_| rotating.pick(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = Seeded::new(42);
        let b = Seeded::new(42);
        let picks_a: Vec<usize> = (0..20).map(|_| a.pick(7)).collect();
        let picks_b: Vec<usize> = (0..20).map(|_| b.pick(7)).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|&i| i < 7));
    }

    #[test]
    fn test_choose() {
        let rotating = Rotating::new();
        let options = ["أ", "ب"];
        assert_eq!(choose(&rotating, &options), "أ");
        assert_eq!(choose(&rotating, &options), "ب");
        assert_eq!(choose(&rotating, &[]), "");
    }
}
