//! Injected randomness.
//!
//! Admission draws and sample-index draws are the only non-determinism in the
//! storage. Both go through [`RandomSource`] so tests can substitute a
//! scripted sequence.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

/// Uniform sampling collaborator.
pub trait RandomSource {
    /// Draw from `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Draw `count` indices from `[0, upper)`.
    ///
    /// Without replacement the indices are distinct, so `count <= upper`.
    fn choice(&mut self, upper: usize, count: usize, replace: bool) -> Vec<usize>;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }

    fn choice(&mut self, upper: usize, count: usize, replace: bool) -> Vec<usize> {
        (**self).choice(upper, count, replace)
    }
}

/// Default [`RandomSource`] backed by `StdRng`.
#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Deterministic source.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Source seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded if a seed is given, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl RandomSource for StdRandom {
    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn choice(&mut self, upper: usize, count: usize, replace: bool) -> Vec<usize> {
        if count == 0 {
            return Vec::new();
        }
        if replace {
            (0..count).map(|_| self.rng.gen_range(0..upper)).collect()
        } else {
            assert!(
                count <= upper,
                "cannot draw {} distinct indices from {}",
                count,
                upper
            );
            index::sample(&mut self.rng, upper, count).into_vec()
        }
    }
}

/// Scripted source for deterministic tests.
///
/// `uniform` cycles through the scripted draws. `choice` pops scripted index
/// lists first and falls back to `0..count`.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedRandom {
    draws: Vec<f64>,
    next_draw: usize,
    choices: std::collections::VecDeque<Vec<usize>>,
}

#[cfg(test)]
impl ScriptedRandom {
    pub(crate) fn new(draws: Vec<f64>) -> Self {
        Self {
            draws,
            ..Default::default()
        }
    }

    pub(crate) fn always(draw: f64) -> Self {
        Self::new(vec![draw])
    }

    pub(crate) fn push_choice(&mut self, indices: Vec<usize>) {
        self.choices.push_back(indices);
    }

    /// Number of `uniform` calls so far.
    pub(crate) fn draws_taken(&self) -> usize {
        self.next_draw
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn uniform(&mut self) -> f64 {
        let index = self.next_draw;
        self.next_draw += 1;
        if self.draws.is_empty() {
            return 0.0;
        }
        self.draws[index % self.draws.len()]
    }

    fn choice(&mut self, _upper: usize, count: usize, _replace: bool) -> Vec<usize> {
        self.choices
            .pop_front()
            .unwrap_or_else(|| (0..count).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uniform_in_unit_interval() {
        let mut rng = StdRandom::seeded(0);
        for _ in 0..1000 {
            let x = rng.uniform();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = StdRandom::seeded(42);
        let mut b = StdRandom::seeded(42);
        assert_eq!(a.choice(100, 10, false), b.choice(100, 10, false));
        assert_eq!(a.uniform(), b.uniform());
    }

    #[test]
    fn test_choice_without_replacement_is_distinct() {
        let mut rng = StdRandom::seeded(1);
        let picked = rng.choice(5, 5, false);
        let unique: HashSet<_> = picked.iter().copied().collect();
        assert_eq!(picked.len(), 5);
        assert_eq!(unique.len(), 5);
        assert!(picked.iter().all(|&i| i < 5));
    }

    #[test]
    fn test_choice_with_replacement_in_range() {
        let mut rng = StdRandom::seeded(2);
        let picked = rng.choice(3, 50, true);
        assert_eq!(picked.len(), 50);
        assert!(picked.iter().all(|&i| i < 3));
    }

    #[test]
    fn test_scripted_cycles() {
        let mut rng = ScriptedRandom::new(vec![0.1, 0.9]);
        assert_eq!(rng.uniform(), 0.1);
        assert_eq!(rng.uniform(), 0.9);
        assert_eq!(rng.uniform(), 0.1);

        rng.push_choice(vec![2, 2]);
        assert_eq!(rng.choice(3, 2, true), vec![2, 2]);
        assert_eq!(rng.choice(3, 2, false), vec![0, 1]);
    }

    #[test]
    fn test_mut_ref_forwards() {
        fn draw<R: RandomSource>(mut rng: R) -> f64 {
            rng.uniform()
        }

        let mut rng = ScriptedRandom::always(0.25);
        assert_eq!(draw(&mut rng), 0.25);
        assert_eq!(rng.uniform(), 0.25);
    }
}
