use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2};
use rand::Rng;

use super::{ParameterStore, energy::Activation};

/// A stochastic binary sample of one layer, together with the activation it was drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSample {
    pub pre_sigmoid: Array2<f32>,
    pub mean: Array2<f32>,
    pub sample: Array2<f32>,
}

/// Every intermediate quantity of one alternating Gibbs step.
#[derive(Debug, Clone, PartialEq)]
pub struct GibbsStep {
    pub visible: LayerSample,
    pub hidden: LayerSample,
}

/// Whether a chain keeps the intermediate steps or only the last one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChainTrace {
    #[default]
    Final,
    /// Keep every step, only meant for diagnostics.
    Full,
}

/// The outcome of running a Gibbs chain.
#[derive(Debug, Clone)]
pub struct ChainOutput {
    /// The last step of the chain.
    pub last: GibbsStep,
    /// Every step before `last`, oldest first. Empty unless `ChainTrace::Full` was requested.
    pub trace: Vec<GibbsStep>,
}

/// Draws samples from the conditionals of an RBM.
///
/// The sampler borrows the parameters and the model's generator for the duration of a step,
/// all the randomness of a model flows through that single generator.
pub struct GibbsSampler<'a, R: Rng> {
    params: &'a ParameterStore,
    rng: &'a mut R,
}

impl<'a, R: Rng> GibbsSampler<'a, R> {
    /// Creates a new `GibbsSampler`.
    ///
    /// # Arguments
    /// * `params` - The parameters defining the conditionals.
    /// * `rng` - The generator to draw the Bernoulli samples with.
    pub fn new(params: &'a ParameterStore, rng: &'a mut R) -> Self {
        Self { params, rng }
    }

    /// Infers the state of the hidden units given the visible units.
    pub fn sample_h_given_v(&mut self, v: ArrayView2<f32>) -> LayerSample {
        let activation = self.params.propup(v);
        self.bernoulli(activation)
    }

    /// Infers the state of the visible units given the hidden units.
    pub fn sample_v_given_h(&mut self, h: ArrayView2<f32>) -> LayerSample {
        let activation = self.params.propdown(h);
        self.bernoulli(activation)
    }

    /// One step of Gibbs sampling starting from the hidden state: `h -> v -> h`.
    pub fn gibbs_hvh(&mut self, h: ArrayView2<f32>) -> GibbsStep {
        let visible = self.sample_v_given_h(h);
        let hidden = self.sample_h_given_v(visible.sample.view());
        GibbsStep { visible, hidden }
    }

    /// One step of Gibbs sampling starting from the visible state: `v -> h -> v`.
    pub fn gibbs_vhv(&mut self, v: ArrayView2<f32>) -> GibbsStep {
        let hidden = self.sample_h_given_v(v);
        let visible = self.sample_v_given_h(hidden.sample.view());
        GibbsStep { visible, hidden }
    }

    /// Runs `k` `gibbs_hvh` steps starting from the hidden configuration `start`.
    ///
    /// # Arguments
    /// * `start` - The initial hidden state of the chain.
    /// * `k` - The amount of steps.
    /// * `trace` - Whether to keep the intermediate steps.
    ///
    /// # Returns
    /// The last step and, if requested, the ones before it.
    pub fn chain(&mut self, start: ArrayView2<f32>, k: NonZeroUsize, trace: ChainTrace) -> ChainOutput {
        let mut steps = Vec::new();
        let mut last = self.gibbs_hvh(start);

        for _ in 1..k.get() {
            let next = self.gibbs_hvh(last.hidden.sample.view());

            if trace == ChainTrace::Full {
                steps.push(last);
            }

            last = next;
        }

        ChainOutput { last, trace: steps }
    }

    fn bernoulli(&mut self, activation: Activation) -> LayerSample {
        let Activation { pre_sigmoid, mean } = activation;
        let rng = &mut *self.rng;
        let sample = mean.mapv(|p| if rng.random::<f32>() < p { 1. } else { 0. });

        LayerSample {
            pre_sigmoid,
            mean,
            sample,
        }
    }
}
