//! Seeded train/validation holdout split.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::IoError;

/// Default seed for the holdout RNG.
pub const DEFAULT_SEED: u64 = 3110;

/// Configuration for a random train/validation split.
///
/// Each row independently draws one uniform value in `[0, 1)`; rows whose
/// draw exceeds `1 - validation_fraction` go to validation. The realised
/// validation share therefore varies around the configured fraction.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `seed`    | 3110    |
#[derive(Debug, Clone)]
pub struct HoldoutConfig {
    validation_fraction: f64,
    seed: u64,
}

impl HoldoutConfig {
    /// Create a new config sending roughly `validation_fraction` of the rows
    /// to validation.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidValidationFraction`] unless the fraction is
    /// in `[0, 1)`.
    pub fn new(validation_fraction: f64) -> Result<Self, IoError> {
        if !(0.0..1.0).contains(&validation_fraction) {
            return Err(IoError::InvalidValidationFraction {
                fraction: validation_fraction,
            });
        }
        Ok(Self {
            validation_fraction,
            seed: DEFAULT_SEED,
        })
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the configured validation fraction.
    #[must_use]
    pub fn validation_fraction(&self) -> f64 {
        self.validation_fraction
    }

    /// Return the configured seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Assign each of `n_rows` row indices to training or validation.
    #[must_use]
    #[instrument(skip(self), fields(fraction = self.validation_fraction, seed = self.seed))]
    pub fn split(&self, n_rows: usize) -> HoldoutSplit {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let threshold = 1.0 - self.validation_fraction;

        let mut training = Vec::with_capacity(n_rows);
        let mut validation = Vec::new();
        for i in 0..n_rows {
            if rng.r#gen::<f64>() > threshold {
                validation.push(i);
            } else {
                training.push(i);
            }
        }

        debug!(
            n_training = training.len(),
            n_validation = validation.len(),
            "holdout split drawn"
        );
        HoldoutSplit {
            training,
            validation,
        }
    }
}

/// Row indices on each side of a holdout split, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    training: Vec<usize>,
    validation: Vec<usize>,
}

impl HoldoutSplit {
    /// Return the training row indices.
    #[must_use]
    pub fn training(&self) -> &[usize] {
        &self.training
    }

    /// Return the validation row indices.
    #[must_use]
    pub fn validation(&self) -> &[usize] {
        &self.validation
    }
}

/// Split `n_rows` row indices with the given fraction and seed.
///
/// Shorthand for `HoldoutConfig::new(validation_fraction)?.with_seed(seed).split(n_rows)`.
///
/// # Errors
///
/// Returns [`IoError::InvalidValidationFraction`] unless the fraction is in `[0, 1)`.
pub fn holdout_split(n_rows: usize, validation_fraction: f64, seed: u64) -> Result<HoldoutSplit, IoError> {
    Ok(HoldoutConfig::new(validation_fraction)?
        .with_seed(seed)
        .split(n_rows))
}
