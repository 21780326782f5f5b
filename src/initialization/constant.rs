use ndarray::{Array, Dimension, ShapeBuilder};

use super::ParamGen;

/// A parameter generator that always generates the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstParamGen {
    value: f32,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to always generate.
    pub fn new(value: f32) -> Self {
        Self { value }
    }

    /// A generator of zeros, the starting point of both biases.
    pub fn zeros() -> Self {
        Self::new(0.)
    }
}

impl ParamGen for ConstParamGen {
    fn sample<Sh, D>(&mut self, shape: Sh) -> Array<f32, D>
    where
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension,
    {
        Array::from_elem(shape, self.value)
    }
}
