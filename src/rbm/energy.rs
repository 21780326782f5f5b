use ndarray::{Array1, Array2, ArrayView2, Axis};

use super::ParameterStore;
use crate::arch::activations::{sigmoid, softplus};

/// The two outputs of propagating a layer through the weights: the pre-sigmoid activation
/// and its sigmoid.
///
/// The pre-activation is kept since log-probabilities must be computed from it, computing them
/// from the already saturated sigmoid yields `ln(0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub pre_sigmoid: Array2<f32>,
    pub mean: Array2<f32>,
}

impl Activation {
    fn from_pre_sigmoid(pre_sigmoid: Array2<f32>) -> Self {
        let mut mean = pre_sigmoid.clone();
        mean.par_mapv_inplace(sigmoid);
        Self { pre_sigmoid, mean }
    }
}

impl ParameterStore {
    /// Computes the free energy of each row of `v`:
    ///
    /// `F(v) = -Σ_j ln(1 + e^(v·W + c)_j) - v·b`
    ///
    /// # Arguments
    /// * `v` - A batch of visible configurations, one per row.
    ///
    /// # Returns
    /// One free energy per row.
    pub fn free_energy(&self, v: ArrayView2<f32>) -> Array1<f32> {
        let wx_b = v.dot(self.weights()) + self.hidden_bias();
        let hidden_term = wx_b.mapv(softplus).sum_axis(Axis(1));
        let vbias_term = v.dot(self.visible_bias());
        -hidden_term - vbias_term
    }

    /// Propagates the visible units activation upwards to the hidden units.
    ///
    /// # Arguments
    /// * `v` - A batch of visible configurations.
    ///
    /// # Returns
    /// `v·W + c` and `P(h = 1 | v)`.
    pub fn propup(&self, v: ArrayView2<f32>) -> Activation {
        Activation::from_pre_sigmoid(v.dot(self.weights()) + self.hidden_bias())
    }

    /// Propagates the hidden units activation downwards to the visible units.
    ///
    /// # Arguments
    /// * `h` - A batch of hidden configurations.
    ///
    /// # Returns
    /// `h·Wᵀ + b` and `P(v = 1 | h)`.
    pub fn propdown(&self, h: ArrayView2<f32>) -> Activation {
        Activation::from_pre_sigmoid(h.dot(&self.weights().t()) + self.visible_bias())
    }
}
