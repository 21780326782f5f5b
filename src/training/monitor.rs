use ndarray::{ArrayView2, Zip};

use crate::{RbmErr, Result, arch::activations::log_sigmoid, rbm::ParameterStore};

/// Stochastic approximation to the pseudo-likelihood, the monitoring cost of PCD.
///
/// Each call looks at a single conditional `P(x_i | x_{-i})`, with `i` rotating over the visible
/// units from one step to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoLikelihood {
    bit_index: usize,
    n_visible: usize,
}

impl PseudoLikelihood {
    /// Creates a new `PseudoLikelihood` starting at the first visible unit.
    ///
    /// # Arguments
    /// * `n_visible` - The size of the visible layer.
    pub fn new(n_visible: usize) -> Self {
        Self {
            bit_index: 0,
            n_visible,
        }
    }

    /// The visible unit the next call will flip.
    pub fn bit_index(&self) -> usize {
        self.bit_index
    }

    /// The visible unit the call after the next one will flip.
    pub fn next_bit_index(&self) -> usize {
        (self.bit_index + 1) % self.n_visible
    }

    /// Moves the rotating index, wrapping it around the visible layer.
    pub fn seek(&mut self, bit_index: usize) {
        self.bit_index = bit_index % self.n_visible;
    }

    /// Computes `n_visible * mean(ln(sigmoid(F(x_flip) - F(x))))` where `x` is the binarized
    /// batch and `x_flip` is `x` with the current bit flipped.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `x` - A batch of visible configurations with `n_visible` columns.
    pub fn cost(&self, params: &ParameterStore, x: ArrayView2<f32>) -> f32 {
        let xi = x.mapv(f32::round);
        let fe_xi = params.free_energy(xi.view());

        let mut xi_flip = xi;
        xi_flip
            .column_mut(self.bit_index)
            .mapv_inplace(|bit| 1. - bit);
        let fe_xi_flip = params.free_energy(xi_flip.view());

        let log_p = (fe_xi_flip - fe_xi).mapv(log_sigmoid).sum() / x.nrows() as f32;
        self.n_visible as f32 * log_p
    }
}

/// Reconstruction cross-entropy, the monitoring cost of CD:
///
/// `mean_rows(Σ_i x_i ln(sigmoid(a_i)) + (1 - x_i) ln(1 - sigmoid(a_i)))`
///
/// It takes the pre-sigmoid activation `a` of the reconstruction rather than its mean, since
/// `ln(1 - sigmoid(a)) = ln(sigmoid(-a))` can then be evaluated without ever saturating.
///
/// # Arguments
/// * `x` - The batch being reconstructed.
/// * `pre_sigmoid_nv` - The pre-sigmoid visible activation at the end of the chain.
///
/// # Returns
/// The cost, which is never positive, or an error if the shapes differ.
pub fn reconstruction_cost(x: ArrayView2<f32>, pre_sigmoid_nv: ArrayView2<f32>) -> Result<f32> {
    if x.nrows() != pre_sigmoid_nv.nrows() {
        return Err(RbmErr::ShapeMismatch {
            what: "reconstruction rows",
            got: pre_sigmoid_nv.nrows(),
            expected: x.nrows(),
        });
    }

    if x.ncols() != pre_sigmoid_nv.ncols() {
        return Err(RbmErr::ShapeMismatch {
            what: "reconstruction columns",
            got: pre_sigmoid_nv.ncols(),
            expected: x.ncols(),
        });
    }

    let mut total = 0.;
    Zip::from(x).and(pre_sigmoid_nv).for_each(|&x, &a| {
        total += x * log_sigmoid(a) + (1. - x) * log_sigmoid(-a);
    });

    Ok(total / x.nrows() as f32)
}
