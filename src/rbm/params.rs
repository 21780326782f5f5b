use ndarray::{Array, Array1, Array2, ArrayD, Dimension, Ix1, Ix2};

use crate::{
    RbmErr, Result,
    initialization::ParamGen,
    optimization::Optimizer,
    training::Gradient,
};

/// The ordered list of parameters exchanged by `dump_params` and `load_params`:
/// `[weights, hidden_bias, visible_bias]`.
pub type ParamList = Vec<ArrayD<f32>>;

const NPARAMS: usize = 3;

/// Owns the learnable tensors of an RBM.
///
/// The shapes are fixed at construction, `load` refuses anything that doesn't match them.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    weights: Array2<f32>,
    hidden_bias: Array1<f32>,
    visible_bias: Array1<f32>,
}

impl ParameterStore {
    /// Creates a new `ParameterStore`.
    ///
    /// # Arguments
    /// * `n_visible` - The size of the visible layer.
    /// * `n_hidden` - The size of the hidden layer.
    /// * `weight_gen` - The generator for the `(n_visible, n_hidden)` weight matrix.
    /// * `bias_gen` - The generator for both bias vectors.
    pub fn new<W, B>(n_visible: usize, n_hidden: usize, weight_gen: &mut W, bias_gen: &mut B) -> Self
    where
        W: ParamGen,
        B: ParamGen,
    {
        Self {
            weights: weight_gen.sample((n_visible, n_hidden)),
            hidden_bias: bias_gen.sample(n_hidden),
            visible_bias: bias_gen.sample(n_visible),
        }
    }

    pub fn n_visible(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_hidden(&self) -> usize {
        self.weights.ncols()
    }

    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    pub fn hidden_bias(&self) -> &Array1<f32> {
        &self.hidden_bias
    }

    pub fn visible_bias(&self) -> &Array1<f32> {
        &self.visible_bias
    }

    /// Copies the parameters out in the exchange order.
    pub fn dump(&self) -> ParamList {
        vec![
            self.weights.clone().into_dyn(),
            self.hidden_bias.clone().into_dyn(),
            self.visible_bias.clone().into_dyn(),
        ]
    }

    /// Replaces every parameter at once.
    ///
    /// # Arguments
    /// * `params` - The parameters in the exchange order.
    ///
    /// # Returns
    /// An error if the list doesn't have exactly three arrays, if any of them doesn't have the
    /// expected shape or holds a non finite value. The store is left untouched on error.
    pub fn load(&mut self, params: ParamList) -> Result<()> {
        let [weights, hidden_bias, visible_bias]: [ArrayD<f32>; NPARAMS] =
            params.try_into().map_err(|params: ParamList| RbmErr::ParamCount {
                got: params.len(),
                expected: NPARAMS,
            })?;

        let (n_visible, n_hidden) = self.weights.dim();
        let weights = conform::<Ix2>("weights", weights, &[n_visible, n_hidden])?;
        let hidden_bias = conform::<Ix1>("hidden bias", hidden_bias, &[n_hidden])?;
        let visible_bias = conform::<Ix1>("visible bias", visible_bias, &[n_visible])?;

        self.weights = weights;
        self.hidden_bias = hidden_bias;
        self.visible_bias = visible_bias;
        Ok(())
    }

    /// Applies a gradient step to every parameter.
    ///
    /// # Arguments
    /// * `optimizer` - The update rule.
    /// * `grad` - The gradient of the cost, with the same shapes as the parameters.
    pub fn update<O: Optimizer>(&mut self, optimizer: &mut O, grad: &Gradient) {
        optimizer.update_params(self.weights.view_mut(), grad.weights.view());
        optimizer.update_params(self.hidden_bias.view_mut(), grad.hidden_bias.view());
        optimizer.update_params(self.visible_bias.view_mut(), grad.visible_bias.view());
    }
}

fn conform<D: Dimension>(
    what: &'static str,
    array: ArrayD<f32>,
    expected: &[usize],
) -> Result<Array<f32, D>> {
    if array.ndim() != expected.len() {
        return Err(RbmErr::ShapeMismatch {
            what,
            got: array.ndim(),
            expected: expected.len(),
        });
    }

    for (&got, &expected) in array.shape().iter().zip(expected) {
        if got != expected {
            return Err(RbmErr::ShapeMismatch {
                what,
                got,
                expected,
            });
        }
    }

    if array.iter().any(|v| !v.is_finite()) {
        return Err(RbmErr::NonFinite { what });
    }

    Ok(array.into_dimensionality::<D>()?)
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, IxDyn};

    use super::*;
    use crate::initialization::ConstParamGen;

    fn store(n_visible: usize, n_hidden: usize) -> ParameterStore {
        ParameterStore::new(
            n_visible,
            n_hidden,
            &mut ConstParamGen::new(0.25),
            &mut ConstParamGen::zeros(),
        )
    }

    #[test]
    fn shapes_follow_the_layer_sizes() {
        let params = store(4, 2);

        assert_eq!(params.weights().dim(), (4, 2));
        assert_eq!(params.hidden_bias().len(), 2);
        assert_eq!(params.visible_bias().len(), 4);
        assert_eq!((params.n_visible(), params.n_hidden()), (4, 2));
    }

    #[test]
    fn dump_is_ordered() {
        let params = store(3, 2).dump();

        assert_eq!(params.len(), 3);
        assert_eq!(params[0].shape(), [3, 2]);
        assert_eq!(params[1].shape(), [2]);
        assert_eq!(params[2].shape(), [3]);
    }

    #[test]
    fn wrong_param_count_fails() {
        let mut params = store(3, 2);
        let mut list = params.dump();
        list.pop();

        let err = params.load(list).unwrap_err();
        assert!(matches!(err, RbmErr::ParamCount { got: 2, expected: 3 }));
    }

    #[test]
    fn wrong_shape_fails_and_keeps_the_old_values() {
        let mut params = store(3, 2);
        let before = params.clone();

        let mut list = params.dump();
        list[0] = Array::zeros(IxDyn(&[2, 3]));

        let err = params.load(list).unwrap_err();
        assert!(matches!(err, RbmErr::ShapeMismatch { what: "weights", .. }));
        assert_eq!(params, before);
    }

    #[test]
    fn wrong_rank_fails() {
        let mut params = store(3, 2);

        let mut list = params.dump();
        list[1] = Array::zeros(IxDyn(&[2, 1]));

        let err = params.load(list).unwrap_err();
        assert!(matches!(
            err,
            RbmErr::ShapeMismatch {
                what: "hidden bias",
                got: 2,
                expected: 1
            }
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut params = store(3, 2);

        let mut list = params.dump();
        list[2].fill(f32::NAN);

        let err = params.load(list).unwrap_err();
        assert!(matches!(err, RbmErr::NonFinite { what: "visible bias" }));
    }
}
