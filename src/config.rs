use std::{fs, num::NonZeroUsize, path::Path};

use serde::{Deserialize, Serialize};

use crate::{RbmErr, Result};

const DEFAULT_N_VISIBLE: NonZeroUsize = NonZeroUsize::new(28 * 28).unwrap();
const DEFAULT_N_HIDDEN: NonZeroUsize = NonZeroUsize::new(500).unwrap();
const DEFAULT_K_STEPS: NonZeroUsize = NonZeroUsize::new(15).unwrap();
const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(128).unwrap();
const DEFAULT_SUPERBATCH_SIZE: NonZeroUsize = NonZeroUsize::new(1280).unwrap();
const DEFAULT_EPOCH_COUNT: NonZeroUsize = NonZeroUsize::new(10).unwrap();
const DEFAULT_SEED: u64 = 1234;

/// The configuration of an `Rbm` and of its training run.
///
/// Every field has a default, so a JSON document only needs to name the ones it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbmConfig {
    /// Size of the visible layer, must match the width of the data.
    pub n_visible: NonZeroUsize,
    /// Size of the hidden layer.
    pub n_hidden: NonZeroUsize,
    /// Length of the Gibbs chain run on every step (the `k` in CD-k / PCD-k).
    pub k_steps: NonZeroUsize,
    pub learning_rate: f32,
    /// Rows per minibatch, also the row count of the persistent chain.
    pub batch_size: NonZeroUsize,
    /// Rows held resident at once while iterating over the training set.
    pub superbatch_size: NonZeroUsize,
    pub epoch_count: NonZeroUsize,
    /// Whether to carry the negative phase chain across steps (PCD) or restart it from the
    /// data on every step (CD).
    pub persistent: bool,
    /// Seed for the model's generator, `None` seeds it from the OS.
    pub seed: Option<u64>,
}

impl Default for RbmConfig {
    fn default() -> Self {
        Self {
            n_visible: DEFAULT_N_VISIBLE,
            n_hidden: DEFAULT_N_HIDDEN,
            k_steps: DEFAULT_K_STEPS,
            learning_rate: 1e-3,
            batch_size: DEFAULT_BATCH_SIZE,
            superbatch_size: DEFAULT_SUPERBATCH_SIZE,
            epoch_count: DEFAULT_EPOCH_COUNT,
            persistent: true,
            seed: Some(DEFAULT_SEED),
        }
    }
}

impl RbmConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Arguments
    /// * `json` - The JSON document.
    ///
    /// # Returns
    /// The parsed configuration or an error if it's malformed or invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Arguments
    /// * `path` - The path to the file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks the invariants serde can't express.
    ///
    /// # Returns
    /// An `InvalidConfig` error describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0. {
            return Err(RbmErr::InvalidConfig(format!(
                "the learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }

        if self.superbatch_size.get() % self.batch_size.get() != 0 {
            return Err(RbmErr::InvalidConfig(format!(
                "the superbatch size ({}) must be a multiple of the batch size ({})",
                self.superbatch_size, self.batch_size
            )));
        }

        Ok(())
    }
}

/// Returns the size of the visible layer for square images flattened into rows.
///
/// # Arguments
/// * `n_dim` - The side of the image in pixels.
/// * `n_chan` - The amount of channels.
pub fn n_visible_for_images(n_dim: usize, n_chan: usize) -> usize {
    n_chan * n_dim * n_dim
}
