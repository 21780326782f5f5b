mod chain;
mod energy;
mod gibbs;
mod params;

use std::num::NonZeroUsize;

use log::{debug, warn};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::{SeedableRng, rngs::StdRng};

pub use chain::PersistentChain;
pub use energy::Activation;
pub use gibbs::{ChainOutput, ChainTrace, GibbsSampler, GibbsStep, LayerSample};
pub use params::{ParamList, ParameterStore};

use crate::{
    RbmErr, Result,
    arch::Model,
    config::RbmConfig,
    dataset::Dataset,
    initialization::{ConstParamGen, RandParamGen},
    optimization::GradientDescent,
    training::{CostEstimator, EpochReport, PseudoLikelihood, StepResult, Trainable, TrainingLoop},
};

/// A binary-binary Restricted Boltzmann Machine trained with CD-k or PCD-k.
///
/// Every random draw of the model, from the weight initialization to the Gibbs samples, comes from
/// its own seeded generator, so two models built from the same configuration evolve identically.
#[derive(Debug)]
pub struct Rbm {
    config: RbmConfig,
    params: ParameterStore,
    estimator: CostEstimator,
    chain: Option<PersistentChain>,
    pseudo_likelihood: PseudoLikelihood,
    rng: StdRng,
}

impl Rbm {
    /// Creates a new `Rbm`.
    ///
    /// The weights are drawn from `U(-r, r)` with `r = sqrt(6 / (n_visible + n_hidden))`, the
    /// biases start at zero and, in persistent mode, so does every unit of the chain.
    ///
    /// # Arguments
    /// * `config` - The model's configuration.
    ///
    /// # Returns
    /// The model or an error if the configuration is invalid.
    pub fn new(config: RbmConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = generate_rng(config.seed);
        let n_visible = config.n_visible.get();
        let n_hidden = config.n_hidden.get();

        let mut weight_gen = RandParamGen::xavier_uniform(&mut rng, n_visible, n_hidden)?;
        let params = ParameterStore::new(
            n_visible,
            n_hidden,
            &mut weight_gen,
            &mut ConstParamGen::zeros(),
        );

        let chain = config
            .persistent
            .then(|| PersistentChain::new(config.batch_size.get(), n_hidden));

        debug!(
            "built rbm: n_visible={n_visible}, n_hidden={n_hidden}, k={}, persistent={}",
            config.k_steps, config.persistent
        );

        Ok(Self {
            estimator: CostEstimator::new(config.k_steps),
            pseudo_likelihood: PseudoLikelihood::new(n_visible),
            config,
            params,
            chain,
            rng,
        })
    }

    pub fn config(&self) -> &RbmConfig {
        &self.config
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    /// The persistent chain, `None` when training with plain contrastive divergence.
    pub fn persistent_chain(&self) -> Option<&PersistentChain> {
        self.chain.as_ref()
    }

    /// The visible unit the next pseudo-likelihood estimate will flip.
    pub fn bit_index(&self) -> usize {
        self.pseudo_likelihood.bit_index()
    }

    /// Computes the free energy of every row of `v`.
    ///
    /// # Returns
    /// One value per row or an error if `v` isn't `n_visible` wide.
    pub fn free_energy(&self, v: ArrayView2<f32>) -> Result<Array1<f32>> {
        self.check_width("visible columns", v.ncols(), self.params.n_visible())?;
        Ok(self.params.free_energy(v))
    }

    /// Computes `P(h = 1 | v)` together with its pre-activation.
    pub fn propup(&self, v: ArrayView2<f32>) -> Result<Activation> {
        self.check_width("visible columns", v.ncols(), self.params.n_visible())?;
        Ok(self.params.propup(v))
    }

    /// Computes `P(v = 1 | h)` together with its pre-activation.
    pub fn propdown(&self, h: ArrayView2<f32>) -> Result<Activation> {
        self.check_width("hidden columns", h.ncols(), self.params.n_hidden())?;
        Ok(self.params.propdown(h))
    }

    /// Runs one CD-k or PCD-k step on `x` and applies it to the model.
    ///
    /// The parameters, the persistent chain and the pseudo-likelihood bit are only touched when
    /// the whole step succeeded.
    ///
    /// # Arguments
    /// * `x` - The minibatch, one visible configuration per row.
    /// * `lr` - The learning rate of this step.
    ///
    /// # Returns
    /// The applied step, or an error if `x` has the wrong shape or the step isn't finite.
    pub fn get_cost_updates(&mut self, x: ArrayView2<f32>, lr: f32) -> Result<StepResult> {
        if !lr.is_finite() {
            return Err(RbmErr::InvalidConfig(format!(
                "the learning rate must be finite, got {lr}"
            )));
        }

        let step = self.estimator.estimate(
            &self.params,
            x,
            self.chain.as_ref(),
            &self.pseudo_likelihood,
            &mut self.rng,
        )?;

        step.apply(
            &mut self.params,
            &mut GradientDescent::new(lr),
            self.chain.as_mut(),
            &mut self.pseudo_likelihood,
        )?;

        Ok(step)
    }

    /// Runs `k` `h -> v -> h` Gibbs steps from the hidden configuration `h0`.
    ///
    /// # Arguments
    /// * `h0` - The starting hidden configuration.
    /// * `k` - The amount of steps.
    /// * `trace` - Whether to keep every step or only the last one.
    pub fn gibbs_chain(
        &mut self,
        h0: ArrayView2<f32>,
        k: NonZeroUsize,
        trace: ChainTrace,
    ) -> Result<ChainOutput> {
        self.check_width("hidden columns", h0.ncols(), self.params.n_hidden())?;
        Ok(GibbsSampler::new(&self.params, &mut self.rng).chain(h0, k, trace))
    }

    /// Lets the model run freely for `steps` `v -> h -> v` Gibbs steps starting at `v0`.
    ///
    /// # Arguments
    /// * `v0` - The starting visible configuration, one chain per row.
    /// * `steps` - The amount of steps.
    ///
    /// # Returns
    /// The last visible layer, its mean being the usual thing to look at.
    pub fn sample(&mut self, v0: ArrayView2<f32>, steps: NonZeroUsize) -> Result<LayerSample> {
        self.check_width("visible columns", v0.ncols(), self.params.n_visible())?;

        let mut sampler = GibbsSampler::new(&self.params, &mut self.rng);
        let mut last = sampler.gibbs_vhv(v0);

        for _ in 1..steps.get() {
            last = sampler.gibbs_vhv(last.visible.sample.view());
        }

        Ok(last.visible)
    }

    fn check_width(&self, what: &'static str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(RbmErr::ShapeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Trainable for Rbm {
    fn train_step(&mut self, x: ArrayView2<f32>) -> Result<StepResult> {
        self.get_cost_updates(x, self.config.learning_rate)
    }

    fn mean_free_energy(&self, x: ArrayView2<f32>) -> Result<f32> {
        let fe = self.free_energy(x)?;
        Ok(fe.sum() / fe.len() as f32)
    }
}

impl Model for Rbm {
    fn fit(
        &mut self,
        x_train: ArrayView2<f32>,
        y_train: ArrayView1<f32>,
        x_val: ArrayView2<f32>,
        y_val: ArrayView1<f32>,
        epoch_count: NonZeroUsize,
        batch_size: NonZeroUsize,
        log_name: &str,
    ) -> Result<Vec<EpochReport>> {
        let n_visible = self.params.n_visible();
        let train = Dataset::new(x_train, n_visible)?;
        let val = Dataset::new(x_val, n_visible)?;
        self.check_width("training labels", y_train.len(), train.len())?;
        self.check_width("validation labels", y_val.len(), val.len())?;

        if let Some(chain) = &self.chain {
            let rows = chain.state().nrows();
            if rows != batch_size.get() {
                warn!(
                    run = log_name;
                    "the persistent chain has {rows} rows but the minibatches have {batch_size}"
                );
            }
        }

        let superbatch = self.config.superbatch_size.get();
        let superbatch_size =
            NonZeroUsize::new(superbatch - superbatch % batch_size.get()).unwrap_or(batch_size);

        TrainingLoop::new(epoch_count, batch_size, superbatch_size).run(self, train, Some(val), log_name)
    }

    fn load_params(&mut self, params: ParamList) -> Result<()> {
        self.params.load(params)
    }

    fn dump_params(&self) -> ParamList {
        self.params.dump()
    }
}

fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    fn config(n_visible: usize, n_hidden: usize, persistent: bool) -> RbmConfig {
        RbmConfig {
            n_visible: NonZeroUsize::new(n_visible).unwrap(),
            n_hidden: NonZeroUsize::new(n_hidden).unwrap(),
            k_steps: NonZeroUsize::new(1).unwrap(),
            batch_size: NonZeroUsize::new(2).unwrap(),
            superbatch_size: NonZeroUsize::new(4).unwrap(),
            persistent,
            ..Default::default()
        }
    }

    #[test]
    fn weights_are_xavier_uniform_and_biases_zero() {
        let rbm = Rbm::new(config(20, 5, true)).unwrap();
        let r = (6f32 / 25.).sqrt();

        assert!(rbm.params().weights().iter().all(|w| w.abs() <= r));
        assert!(rbm.params().weights().iter().any(|&w| w != 0.));
        assert!(rbm.params().hidden_bias().iter().all(|&b| b == 0.));
        assert!(rbm.params().visible_bias().iter().all(|&b| b == 0.));
    }

    #[test]
    fn the_chain_exists_only_in_persistent_mode() {
        let pcd = Rbm::new(config(4, 3, true)).unwrap();
        let cd = Rbm::new(config(4, 3, false)).unwrap();

        let chain = pcd.persistent_chain().unwrap();
        assert_eq!(chain.state().dim(), (2, 3));
        assert!(chain.state().iter().all(|&h| h == 0.));
        assert!(cd.persistent_chain().is_none());
    }

    #[test]
    fn the_same_seed_builds_the_same_model() {
        let a = Rbm::new(config(6, 3, true)).unwrap();
        let b = Rbm::new(config(6, 3, true)).unwrap();

        assert_eq!(a.params(), b.params());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config(4, 3, true);
        config.learning_rate = f32::NAN;

        assert!(matches!(Rbm::new(config), Err(RbmErr::InvalidConfig(_))));
    }

    #[test]
    fn wrong_widths_are_rejected() {
        let mut rbm = Rbm::new(config(4, 3, false)).unwrap();
        let x = Array2::<f32>::zeros((2, 5));

        assert!(rbm.free_energy(x.view()).is_err());
        assert!(rbm.propup(x.view()).is_err());
        assert!(rbm.propdown(x.view()).is_err());
        assert!(rbm.get_cost_updates(x.view(), 0.1).is_err());
        assert!(rbm.sample(x.view(), NonZeroUsize::MIN).is_err());
        assert!(rbm.gibbs_chain(x.view(), NonZeroUsize::MIN, ChainTrace::Final).is_err());
    }

    #[test]
    fn sampling_returns_the_last_visible_layer() {
        let mut rbm = Rbm::new(config(4, 3, false)).unwrap();
        let v0 = array![[1., 0., 1., 0.], [0., 0., 1., 1.]];

        let v = rbm.sample(v0.view(), NonZeroUsize::new(10).unwrap()).unwrap();

        assert_eq!(v.sample.dim(), (2, 4));
        assert!(v.mean.iter().all(|&p| p > 0. && p < 1.));
    }

    #[test]
    fn labels_must_match_the_samples() {
        let mut rbm = Rbm::new(config(2, 2, false)).unwrap();
        let x = Array2::<f32>::zeros((4, 2));
        let y = Array1::<f32>::zeros(3);
        let y_ok = Array1::<f32>::zeros(4);
        let n = NonZeroUsize::new(2).unwrap();

        let err = rbm
            .fit(x.view(), y.view(), x.view(), y_ok.view(), n, n, "test")
            .unwrap_err();

        assert!(matches!(err, RbmErr::ShapeMismatch { what: "training labels", .. }));
    }
}
