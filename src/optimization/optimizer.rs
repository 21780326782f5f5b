use ndarray::{ArrayView, ArrayViewMut, Dimension};

pub trait Optimizer {
    /// Updates `params` in place given their gradient.
    fn update_params<D: Dimension>(&mut self, params: ArrayViewMut<f32, D>, grad: ArrayView<f32, D>);
}
