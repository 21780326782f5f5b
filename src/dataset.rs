use std::num::NonZeroUsize;

use log::debug;
use ndarray::{ArrayView2, s};

use crate::{RbmErr, Result};

/// A borrowed matrix of training samples, one flattened visible configuration per row.
#[derive(Debug, Clone, Copy)]
pub struct Dataset<'a> {
    x: ArrayView2<'a, f32>,
}

impl<'a> Dataset<'a> {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The samples.
    /// * `n_visible` - The width every sample must have.
    ///
    /// # Returns
    /// An error if the width of `x` isn't `n_visible`.
    pub fn new(x: ArrayView2<'a, f32>, n_visible: usize) -> Result<Self> {
        if x.ncols() != n_visible {
            return Err(RbmErr::ShapeMismatch {
                what: "sample width",
                got: x.ncols(),
                expected: n_visible,
            });
        }

        Ok(Self { x })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn view(&self) -> ArrayView2<'a, f32> {
        self.x
    }

    /// The amount of full minibatches, trailing rows that don't fill one are never visited.
    pub fn n_batches(&self, batch_size: NonZeroUsize) -> usize {
        self.len() / batch_size.get()
    }

    /// Iterates over the contiguous minibatches of the dataset in order.
    ///
    /// Batches are grouped into superbatches, the unit in which data would be staged into
    /// device memory. Here staging is just a slice, but the grouping is kept so the visiting
    /// order stays the same for every superbatch size.
    ///
    /// # Arguments
    /// * `batch_size` - The rows per minibatch.
    /// * `superbatch_size` - The rows per superbatch, rounded down to a multiple of `batch_size`.
    pub fn batches(
        self,
        batch_size: NonZeroUsize,
        superbatch_size: NonZeroUsize,
    ) -> impl Iterator<Item = ArrayView2<'a, f32>> {
        let batch = batch_size.get();
        let per_superbatch = (superbatch_size.get() / batch).max(1);
        let n_batches = self.n_batches(batch_size);
        let x = self.x;

        (0..n_batches)
            .step_by(per_superbatch)
            .flat_map(move |first| {
                let last = (first + per_superbatch).min(n_batches);
                debug!("staging superbatch: rows {}..{}", first * batch, last * batch);

                let superbatch = x.slice_move(s![first * batch..last * batch, ..]);
                (0..last - first).map(move |i| superbatch.slice_move(s![i * batch..(i + 1) * batch, ..]))
            })
    }
}
