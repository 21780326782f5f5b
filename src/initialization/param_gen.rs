use ndarray::{Array, Dimension, ShapeBuilder};

/// A `ParamGen` generates values for the initial state of the model's parameters.
pub trait ParamGen {
    /// Generates a parameter array of the given shape.
    ///
    /// # Arguments
    /// * `shape` - The shape of the parameter tensor.
    ///
    /// # Returns
    /// A freshly generated array.
    fn sample<Sh, D>(&mut self, shape: Sh) -> Array<f32, D>
    where
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension;
}
