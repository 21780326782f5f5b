use ndarray::{Array2, ArrayView2};

use crate::{RbmErr, Result};

/// The hidden configuration of a Markov chain that survives across training steps.
///
/// It's allocated once, when the model is built, and then overwritten in place at the end of
/// every persistent training step. Epoch boundaries don't reset it.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentChain {
    state: Array2<f32>,
    updates: usize,
}

impl PersistentChain {
    /// Creates a new `PersistentChain` with every hidden unit off.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of parallel chains, one per minibatch row.
    /// * `n_hidden` - The size of the hidden layer.
    pub fn new(batch_size: usize, n_hidden: usize) -> Self {
        Self::from_state(Array2::zeros((batch_size, n_hidden)))
    }

    /// Creates a new `PersistentChain` starting at `state`.
    pub fn from_state(state: Array2<f32>) -> Self {
        Self { state, updates: 0 }
    }

    /// The current hidden configuration.
    pub fn state(&self) -> ArrayView2<'_, f32> {
        self.state.view()
    }

    /// Returns how many times the chain was advanced since it was created.
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Overwrites the chain with its new hidden configuration.
    ///
    /// # Arguments
    /// * `state` - The last hidden sample of the chain.
    ///
    /// # Returns
    /// An error if `state` doesn't have the chain's shape.
    pub fn advance(&mut self, state: ArrayView2<f32>) -> Result<()> {
        let (rows, cols) = self.state.dim();

        if state.nrows() != rows {
            return Err(RbmErr::ShapeMismatch {
                what: "persistent chain rows",
                got: state.nrows(),
                expected: rows,
            });
        }

        if state.ncols() != cols {
            return Err(RbmErr::ShapeMismatch {
                what: "persistent chain columns",
                got: state.ncols(),
                expected: cols,
            });
        }

        self.state.assign(&state);
        self.updates += 1;
        Ok(())
    }
}
