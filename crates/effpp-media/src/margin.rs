//! Per-frame crop margins.

use std::collections::HashMap;

use effpp_models::IdentityKey;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{MediaError, MediaResult};

pub const DEFAULT_MARGIN_LOW: f64 = 0.04;
pub const DEFAULT_MARGIN_HIGH: f64 = 0.20;
pub const DEFAULT_EVAL_MARGIN: f64 = 0.125;

/// Chooses the margin ratio for each (identity, rank).
///
/// Training mode draws a seeded uniform margin once per key and reuses it,
/// so all five variants of a rank are cropped identically. Eval mode always
/// returns the fixed margin.
#[derive(Debug)]
pub struct MarginPlanner {
    low: f64,
    high: f64,
    fixed: Option<f64>,
    rng: StdRng,
    cache: HashMap<(IdentityKey, u32), f64>,
}

impl MarginPlanner {
    /// Random margins in `[low, high]`, stable for a given identity and rank.
    ///
    /// # Arguments
    /// * `low` - Smallest margin fraction
    /// * `high` - Largest margin fraction
    /// * `seed` - Seed for the margin generator
    pub fn training(low: f64, high: f64, seed: u64) -> MediaResult<Self> {
        if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
            return Err(MediaError::InvalidMargin { low, high });
        }
        Ok(Self {
            low,
            high,
            fixed: None,
            rng: StdRng::seed_from_u64(seed),
            cache: HashMap::new(),
        })
    }

    /// Fixed margin for evaluation crops.
    pub fn eval(fixed: f64) -> Self {
        Self {
            low: fixed,
            high: fixed,
            fixed: Some(fixed),
            rng: StdRng::seed_from_u64(0),
            cache: HashMap::new(),
        }
    }

    /// Margin fraction for one frame.
    pub fn margin(&mut self, identity: &IdentityKey, rank: u32) -> f64 {
        if let Some(fixed) = self.fixed {
            return fixed;
        }
        let (low, high) = (self.low, self.high);
        let rng = &mut self.rng;
        *self
            .cache
            .entry((identity.clone(), rank))
            .or_insert_with(|| rng.random_range(low..=high))
    }
}
