use ndarray::{Array, Dimension, ShapeBuilder};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::ParamGen;
use crate::Result;

/// A parameter generator that follows a certain probabilistic distribution.
///
/// It borrows the generator of the model being initialized, so that two models built from the
/// same seed start from identical parameters.
pub struct RandParamGen<'r, R: Rng, D: Distribution<f32>> {
    rng: &'r mut R,
    distribution: D,
}

impl<'r, R: Rng, D: Distribution<f32>> RandParamGen<'r, R, D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `distribution` - The distribution to sample the random numbers from.
    pub fn new(rng: &'r mut R, distribution: D) -> Self {
        Self { rng, distribution }
    }
}

impl<'r, R: Rng> RandParamGen<'r, R, Uniform<f32>> {
    /// Creates a new `RandParamGen` parameter generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(rng: &'r mut R, low: f32, high: f32) -> Result<Self> {
        Ok(Self::new(rng, Uniform::new(low, high)?))
    }

    /// Creates a new `RandParamGen` parameter generator using Xavier uniform initialization,
    /// that is, `U(-r, r)` with `r = sqrt(6 / (fan_in + fan_out))`.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `fan_in` - The number of input units in the weight tensor.
    /// * `fan_out` - The number of output units in the weight tensor.
    ///
    /// # Returns
    /// An error if the calculated range is invalid.
    pub fn xavier_uniform(rng: &'r mut R, fan_in: usize, fan_out: usize) -> Result<Self> {
        let range = (6. / (fan_in + fan_out) as f32).sqrt();
        Self::uniform(rng, -range, range)
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<'_, R, D> {
    fn sample<Sh, Dim>(&mut self, shape: Sh) -> Array<f32, Dim>
    where
        Sh: ShapeBuilder<Dim = Dim>,
        Dim: Dimension,
    {
        Array::random_using(shape, &self.distribution, &mut *self.rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn xavier_uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut param_gen = RandParamGen::xavier_uniform(&mut rng, 4, 2).unwrap();
        let sample = param_gen.sample((4, 2));
        let range = 1.0f32;

        assert_eq!(sample.shape(), [4, 2]);
        assert!(sample.iter().all(|&w| (-range..range).contains(&w)));
    }

    #[test]
    fn same_seed_same_sample() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);

        let a = RandParamGen::xavier_uniform(&mut rng1, 6, 3).unwrap().sample((6, 3));
        let b = RandParamGen::xavier_uniform(&mut rng2, 6, 3).unwrap().sample((6, 3));

        assert_eq!(a, b);
    }

    #[test]
    fn empty_range_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(RandParamGen::uniform(&mut rng, 1., 1.).is_err());
    }
}
