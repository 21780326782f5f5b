use std::{num::NonZeroUsize, str::FromStr};

use ndarray::{ArrayView1, ArrayView2};

use crate::{
    RbmErr, Result,
    config::RbmConfig,
    rbm::{ParamList, Rbm},
    training::EpochReport,
};

/// The contract every trainable architecture honors.
pub trait Model {
    /// Trains the model over the training set for `epoch_count` epochs.
    ///
    /// # Arguments
    /// * `x_train` - The training samples, one flattened sample per row.
    /// * `y_train` - The training labels, one per sample.
    /// * `x_val` - The validation samples.
    /// * `y_val` - The validation labels.
    /// * `epoch_count` - The amount of passes over the training set.
    /// * `batch_size` - The rows per minibatch.
    /// * `log_name` - The name of the run, attached to every log record.
    ///
    /// # Returns
    /// One report per epoch.
    #[allow(clippy::too_many_arguments)]
    fn fit(
        &mut self,
        x_train: ArrayView2<f32>,
        y_train: ArrayView1<f32>,
        x_val: ArrayView2<f32>,
        y_val: ArrayView1<f32>,
        epoch_count: NonZeroUsize,
        batch_size: NonZeroUsize,
        log_name: &str,
    ) -> Result<Vec<EpochReport>>;

    /// Replaces every parameter of the model.
    fn load_params(&mut self, params: ParamList) -> Result<()>;

    /// Copies every parameter of the model out.
    fn dump_params(&self) -> ParamList;
}

/// The architectures that can be built by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Rbm,
}

impl ModelKind {
    /// Builds a fresh model of this kind.
    ///
    /// # Arguments
    /// * `config` - The model's configuration.
    pub fn build(self, config: RbmConfig) -> Result<Box<dyn Model>> {
        match self {
            ModelKind::Rbm => Ok(Box::new(Rbm::new(config)?)),
        }
    }
}

impl FromStr for ModelKind {
    type Err = RbmErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rbm" => Ok(ModelKind::Rbm),
            other => Err(RbmErr::InvalidConfig(format!("invalid model: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_parse() {
        assert_eq!("rbm".parse::<ModelKind>().unwrap(), ModelKind::Rbm);
    }

    #[test]
    fn unknown_names_are_rejected() {
        for name in ["", "RBM", "vae", "softmax"] {
            let err = name.parse::<ModelKind>().unwrap_err();
            assert!(matches!(err, RbmErr::InvalidConfig(_)), "{name}");
        }
    }

    #[test]
    fn built_models_dump_their_parameters() {
        let config = RbmConfig {
            n_visible: NonZeroUsize::new(5).unwrap(),
            n_hidden: NonZeroUsize::new(2).unwrap(),
            ..Default::default()
        };

        let model = ModelKind::Rbm.build(config).unwrap();
        let params = model.dump_params();

        assert_eq!(params[0].shape(), [5, 2]);
        assert_eq!(params[1].shape(), [2]);
        assert_eq!(params[2].shape(), [5]);
    }
}
