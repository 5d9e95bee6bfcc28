use std::collections::BTreeSet;

use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use tirage_db::models::{DRAW_SIZE, Draw};

use crate::error::{Result, SimError};

/// Au-delà, le tirage pondéré complète uniformément parmi les numéros restants.
const MAX_WEIGHTED_ATTEMPTS: usize = DRAW_SIZE * 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    #[default]
    Uniform,
    Weighted,
}

impl std::fmt::Display for DrawMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawMode::Uniform => write!(f, "uniforme"),
            DrawMode::Weighted => write!(f, "pondéré"),
        }
    }
}

/// Biais du mode pondéré : les numéros 1..=favored_max pèsent `favored_weight`, les autres 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weighting {
    pub favored_max: u8,
    pub favored_weight: f64,
}

impl Default for Weighting {
    fn default() -> Self {
        Self {
            favored_max: 20,
            favored_weight: 2.0,
        }
    }
}

impl Weighting {
    pub fn weight_of(&self, number: u8) -> f64 {
        if number <= self.favored_max {
            self.favored_weight
        } else {
            1.0
        }
    }

    pub fn validate(&self, pool_size: u8) -> Result<()> {
        if !self.favored_weight.is_finite() || self.favored_weight <= 0.0 {
            return Err(SimError::config(format!(
                "poids favorisé invalide : {}",
                self.favored_weight
            )));
        }
        if self.favored_max > pool_size {
            return Err(SimError::config(format!(
                "plage favorisée 1-{} hors du pool 1-{}",
                self.favored_max, pool_size
            )));
        }
        let total = self.favored_weight * self.favored_max as f64
            + (pool_size - self.favored_max) as f64;
        if !total.is_finite() {
            return Err(SimError::config(format!(
                "poids favorisé {} : somme des poids non finie",
                self.favored_weight
            )));
        }
        Ok(())
    }
}

/// Tire 9 numéros distincts dans [1, pool_size].
pub fn generate_draw<R: Rng + ?Sized>(
    mode: DrawMode,
    weighting: &Weighting,
    pool_size: u8,
    rng: &mut R,
) -> Result<Draw> {
    if (pool_size as usize) < DRAW_SIZE {
        return Err(SimError::config(format!(
            "pool de {} numéros, au moins {} requis",
            pool_size, DRAW_SIZE
        )));
    }
    match mode {
        DrawMode::Uniform => Ok(uniform_draw(pool_size, rng)),
        DrawMode::Weighted => weighted_draw(weighting, pool_size, rng),
    }
}

fn uniform_draw<R: Rng + ?Sized>(pool_size: u8, rng: &mut R) -> Draw {
    let mut numbers = [0u8; DRAW_SIZE];
    for (slot, idx) in numbers
        .iter_mut()
        .zip(index::sample(rng, pool_size as usize, DRAW_SIZE))
    {
        *slot = (idx + 1) as u8;
    }
    Draw::new(numbers)
}

/// Échantillonnage pondéré avec remise dans un accumulateur dédupliquant.
/// Approximation du tirage pondéré sans remise, pas sa loi exacte.
fn weighted_draw<R: Rng + ?Sized>(
    weighting: &Weighting,
    pool_size: u8,
    rng: &mut R,
) -> Result<Draw> {
    weighting.validate(pool_size)?;

    let weights: Vec<f64> = (1..=pool_size).map(|n| weighting.weight_of(n)).collect();
    let dist = WeightedIndex::new(&weights).map_err(|e| SimError::Sampling(e.to_string()))?;

    let mut selected: BTreeSet<u8> = BTreeSet::new();
    let mut attempts = 0;
    while selected.len() < DRAW_SIZE && attempts < MAX_WEIGHTED_ATTEMPTS {
        selected.insert((dist.sample(rng) + 1) as u8);
        attempts += 1;
    }

    if selected.len() < DRAW_SIZE {
        log::debug!(
            "tirage pondéré bloqué à {} numéros après {} essais, complément uniforme",
            selected.len(),
            attempts
        );
        let remaining: Vec<u8> = (1..=pool_size).filter(|n| !selected.contains(n)).collect();
        let missing = DRAW_SIZE - selected.len();
        for idx in index::sample(rng, remaining.len(), missing) {
            selected.insert(remaining[idx]);
        }
    }

    let mut numbers = [0u8; DRAW_SIZE];
    for (slot, n) in numbers.iter_mut().zip(selected) {
        *slot = n;
    }
    Ok(Draw::new(numbers))
}
