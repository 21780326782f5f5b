use std::num::NonZeroUsize;

use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;

use super::monitor::{PseudoLikelihood, reconstruction_cost};
use crate::{
    RbmErr, Result,
    optimization::Optimizer,
    rbm::{ChainOutput, ChainTrace, GibbsSampler, ParameterStore, PersistentChain},
};

/// The gradient of `mean(F(x)) - mean(F(chain_end))` with respect to every parameter, with the
/// chain end held constant.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub weights: Array2<f32>,
    pub hidden_bias: Array1<f32>,
    pub visible_bias: Array1<f32>,
}

impl Gradient {
    /// Differentiates the free energy difference between the data and the negative phase.
    ///
    /// Since `∂F(v)/∂W = -vᵀ·P(h | v)`, `∂F(v)/∂c = -P(h | v)` and `∂F(v)/∂b = -v`, every term is
    /// an average of the outer products of each phase.
    ///
    /// # Arguments
    /// * `x` - The positive batch.
    /// * `positive_mean` - `P(h = 1 | x)`.
    /// * `chain_end` - The negative visible sample.
    /// * `negative_mean` - `P(h = 1 | chain_end)`.
    fn free_energy_difference(
        x: ArrayView2<f32>,
        positive_mean: ArrayView2<f32>,
        chain_end: ArrayView2<f32>,
        negative_mean: ArrayView2<f32>,
    ) -> Self {
        let n_pos = x.nrows() as f32;
        let n_neg = chain_end.nrows() as f32;

        Self {
            weights: chain_end.t().dot(&negative_mean) / n_neg - x.t().dot(&positive_mean) / n_pos,
            hidden_bias: negative_mean.sum_axis(Axis(0)) / n_neg
                - positive_mean.sum_axis(Axis(0)) / n_pos,
            visible_bias: chain_end.sum_axis(Axis(0)) / n_neg - x.sum_axis(Axis(0)) / n_pos,
        }
    }

    fn is_finite(&self) -> bool {
        self.weights
            .iter()
            .chain(&self.hidden_bias)
            .chain(&self.visible_bias)
            .all(|g| g.is_finite())
    }
}

/// Everything a single CD/PCD step produces, before any of it is applied to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// `mean(F(x)) - mean(F(chain_end))`, the quantity being differentiated.
    pub cost: f32,
    /// Pseudo-likelihood in persistent mode, reconstruction cross-entropy otherwise.
    pub monitoring_cost: f32,
    pub gradient: Gradient,
    /// The last visible sample of the negative chain.
    pub chain_end: Array2<f32>,
    /// The new persistent chain state, only present in persistent mode.
    pub chain_end_hidden: Option<Array2<f32>>,
    /// The pseudo-likelihood bit for the next step, only present in persistent mode.
    pub next_bit_index: Option<usize>,
}

impl StepResult {
    /// Commits this step to the model.
    ///
    /// The persistent chain is advanced first since it's the only fallible part, so a failure
    /// leaves the model exactly as it was.
    ///
    /// # Arguments
    /// * `params` - The parameters to update.
    /// * `optimizer` - The update rule.
    /// * `chain` - The persistent chain, if the model has one.
    /// * `pseudo_likelihood` - The rotating pseudo-likelihood monitor.
    pub fn apply<O: Optimizer>(
        &self,
        params: &mut ParameterStore,
        optimizer: &mut O,
        chain: Option<&mut PersistentChain>,
        pseudo_likelihood: &mut PseudoLikelihood,
    ) -> Result<()> {
        if let (Some(chain), Some(state)) = (chain, &self.chain_end_hidden) {
            chain.advance(state.view())?;
        }

        params.update(optimizer, &self.gradient);

        if let Some(bit_index) = self.next_bit_index {
            pseudo_likelihood.seek(bit_index);
        }

        Ok(())
    }

    fn check_finite(&self) -> Result<()> {
        if !self.cost.is_finite() {
            return Err(RbmErr::NonFinite { what: "cost" });
        }

        if !self.monitoring_cost.is_finite() {
            return Err(RbmErr::NonFinite {
                what: "monitoring cost",
            });
        }

        if !self.gradient.is_finite() {
            return Err(RbmErr::NonFinite { what: "gradient" });
        }

        Ok(())
    }
}

/// Estimates the CD-k or PCD-k gradient of a batch.
#[derive(Debug, Clone, Copy)]
pub struct CostEstimator {
    k_steps: NonZeroUsize,
    trace: ChainTrace,
}

impl CostEstimator {
    /// Creates a new `CostEstimator`.
    ///
    /// # Arguments
    /// * `k_steps` - The amount of Gibbs steps of the negative chain.
    pub fn new(k_steps: NonZeroUsize) -> Self {
        Self {
            k_steps,
            trace: ChainTrace::Final,
        }
    }

    pub fn k_steps(&self) -> NonZeroUsize {
        self.k_steps
    }

    /// Computes a full training step without touching the model.
    ///
    /// The negative chain starts from the persistent state when `chain` is given (PCD) and from
    /// the hidden sample of the batch otherwise (CD).
    ///
    /// # Arguments
    /// * `params` - The current parameters.
    /// * `x` - The batch, one visible configuration per row.
    /// * `chain` - The persistent chain, `None` for plain contrastive divergence.
    /// * `pseudo_likelihood` - The monitor used in persistent mode.
    /// * `rng` - The generator every sample is drawn with.
    ///
    /// # Returns
    /// The step's result, or an error if the batch is empty, has the wrong width or if any of
    /// the resulting quantities isn't finite.
    pub fn estimate<R: Rng>(
        &self,
        params: &ParameterStore,
        x: ArrayView2<f32>,
        chain: Option<&PersistentChain>,
        pseudo_likelihood: &PseudoLikelihood,
        rng: &mut R,
    ) -> Result<StepResult> {
        if x.nrows() == 0 {
            return Err(RbmErr::EmptyBatch);
        }

        if x.ncols() != params.n_visible() {
            return Err(RbmErr::ShapeMismatch {
                what: "batch columns",
                got: x.ncols(),
                expected: params.n_visible(),
            });
        }

        let mut sampler = GibbsSampler::new(params, rng);
        let positive = sampler.sample_h_given_v(x);

        let chain_start = match chain {
            Some(chain) => chain.state(),
            None => positive.sample.view(),
        };

        let ChainOutput { last, .. } = sampler.chain(chain_start, self.k_steps, self.trace);
        let chain_end = last.visible.sample;
        let negative = params.propup(chain_end.view());

        let cost = mean(params.free_energy(x)) - mean(params.free_energy(chain_end.view()));
        let gradient = Gradient::free_energy_difference(
            x,
            positive.mean.view(),
            chain_end.view(),
            negative.mean.view(),
        );

        let (monitoring_cost, chain_end_hidden, next_bit_index) = match chain {
            Some(_) => (
                pseudo_likelihood.cost(params, x),
                Some(last.hidden.sample),
                Some(pseudo_likelihood.next_bit_index()),
            ),
            None => (
                reconstruction_cost(x, last.visible.pre_sigmoid.view())?,
                None,
                None,
            ),
        };

        let step = StepResult {
            cost,
            monitoring_cost,
            gradient,
            chain_end,
            chain_end_hidden,
            next_bit_index,
        };

        debug!(
            "step: rows={}, cost={}, monitoring_cost={}",
            x.nrows(),
            step.cost,
            step.monitoring_cost
        );

        step.check_finite()?;
        Ok(step)
    }
}

fn mean(values: Array1<f32>) -> f32 {
    values.sum() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        initialization::{ConstParamGen, RandParamGen},
        optimization::GradientDescent,
    };

    fn random_params(rng: &mut StdRng, n_visible: usize, n_hidden: usize) -> ParameterStore {
        let mut weight_gen = RandParamGen::uniform(rng, -0.5, 0.5).unwrap();
        ParameterStore::new(n_visible, n_hidden, &mut weight_gen, &mut ConstParamGen::zeros())
    }

    fn k(k: usize) -> NonZeroUsize {
        NonZeroUsize::new(k).unwrap()
    }

    #[test]
    fn gradient_matches_the_phase_statistics() {
        let x = array![[1., 0.], [1., 1.]];
        let pos = array![[0.5, 0.25, 1.], [0.5, 0.75, 0.]];
        let v_neg = array![[0., 1.]];
        let neg = array![[1., 0.5, 0.25]];

        let grad =
            Gradient::free_energy_difference(x.view(), pos.view(), v_neg.view(), neg.view());

        // xᵀ·pos / 2 = [[0.5, 0.5, 0.5], [0.25, 0.375, 0]]
        let expected_w = array![[0., 0., 0.], [1., 0.5, 0.25]] - array![[0.5, 0.5, 0.5], [0.25, 0.375, 0.]];
        assert_eq!(grad.weights, expected_w);
        assert_eq!(grad.hidden_bias, array![0.5, 0., -0.25]);
        assert_eq!(grad.visible_bias, array![-1., 0.5]);
    }

    #[test]
    fn contrastive_divergence_monitors_the_reconstruction() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = random_params(&mut rng, 4, 3);
        let pl = PseudoLikelihood::new(4);
        let x = array![[1., 0., 1., 0.], [0., 1., 1., 0.]];

        let step = CostEstimator::new(k(1))
            .estimate(&params, x.view(), None, &pl, &mut rng)
            .unwrap();

        assert!(step.monitoring_cost <= 0.);
        assert_eq!(step.chain_end.dim(), (2, 4));
        assert!(step.chain_end_hidden.is_none());
        assert!(step.next_bit_index.is_none());
    }

    #[test]
    fn persistent_step_reports_the_new_chain_state() {
        let mut rng = StdRng::seed_from_u64(2);
        let params = random_params(&mut rng, 4, 3);
        let pl = PseudoLikelihood::new(4);
        let chain = PersistentChain::new(5, 3);
        let x = array![[1., 0., 1., 0.], [0., 1., 1., 0.]];

        let step = CostEstimator::new(k(3))
            .estimate(&params, x.view(), Some(&chain), &pl, &mut rng)
            .unwrap();

        assert_eq!(step.chain_end.dim(), (5, 4));
        assert_eq!(step.chain_end_hidden.as_ref().map(|h| h.dim()), Some((5, 3)));
        assert_eq!(step.next_bit_index, Some(1));
    }

    #[test]
    fn estimate_does_not_touch_the_model() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = random_params(&mut rng, 3, 2);
        let before = params.clone();
        let pl = PseudoLikelihood::new(3);
        let chain = PersistentChain::new(2, 2);

        CostEstimator::new(k(2))
            .estimate(&params, array![[1., 1., 0.]].view(), Some(&chain), &pl, &mut rng)
            .unwrap();

        assert_eq!(params, before);
        assert_eq!(chain.updates(), 0);
        assert_eq!(pl.bit_index(), 0);
    }

    #[test]
    fn apply_moves_against_the_gradient() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut params = random_params(&mut rng, 3, 2);
        let before = params.clone();
        let mut pl = PseudoLikelihood::new(3);
        let mut chain = PersistentChain::new(1, 2);

        let step = CostEstimator::new(k(1))
            .estimate(&params, array![[1., 0., 1.]].view(), Some(&chain), &pl, &mut rng)
            .unwrap();
        step.apply(&mut params, &mut GradientDescent::new(0.5), Some(&mut chain), &mut pl)
            .unwrap();

        let expected = before.weights() - &(&step.gradient.weights * 0.5);
        assert!((params.weights() - &expected).iter().all(|d| d.abs() < 1e-6));
        assert_eq!(chain.updates(), 1);
        assert_eq!(pl.bit_index(), 1);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        let params = random_params(&mut rng, 3, 2);
        let x = Array2::<f32>::zeros((0, 3));

        let err = CostEstimator::new(k(1))
            .estimate(&params, x.view(), None, &PseudoLikelihood::new(3), &mut rng)
            .unwrap_err();

        assert!(matches!(err, RbmErr::EmptyBatch));
    }

    #[test]
    fn non_finite_input_is_fatal() {
        let mut rng = StdRng::seed_from_u64(6);
        let params = random_params(&mut rng, 3, 2);
        let x = array![[1., f32::NAN, 0.]];

        let err = CostEstimator::new(k(1))
            .estimate(&params, x.view(), None, &PseudoLikelihood::new(3), &mut rng)
            .unwrap_err();

        assert!(matches!(err, RbmErr::NonFinite { .. }));
    }
}
