use std::{
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use log::{info, warn};
use ndarray::ArrayView2;

use super::StepResult;
use crate::{RbmErr, Result, dataset::Dataset};

/// A model the training loop can drive one minibatch at a time.
pub trait Trainable {
    /// Runs a single training step on `x` and applies it.
    fn train_step(&mut self, x: ArrayView2<f32>) -> Result<StepResult>;

    /// The mean free energy of `x` under the current parameters.
    fn mean_free_energy(&self, x: ArrayView2<f32>) -> Result<f32>;
}

/// What happened during one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// Zero based.
    pub epoch: usize,
    /// Wall time since training started.
    pub elapsed: Duration,
    pub batches: usize,
    /// The mean monitoring cost over the epoch's minibatches.
    pub loss: f32,
    /// The mean free energy of the validation set after the epoch, if there was one.
    pub val_free_energy: Option<f32>,
}

/// Drives a `Trainable` over a dataset for a fixed amount of epochs.
#[derive(Debug, Clone, Copy)]
pub struct TrainingLoop {
    epochs: NonZeroUsize,
    batch_size: NonZeroUsize,
    superbatch_size: NonZeroUsize,
}

impl TrainingLoop {
    /// Creates a new `TrainingLoop`.
    ///
    /// # Arguments
    /// * `epochs` - The amount of passes over the dataset.
    /// * `batch_size` - The rows per minibatch.
    /// * `superbatch_size` - The rows per superbatch.
    pub fn new(epochs: NonZeroUsize, batch_size: NonZeroUsize, superbatch_size: NonZeroUsize) -> Self {
        Self {
            epochs,
            batch_size,
            superbatch_size,
        }
    }

    /// Trains `model` on `train`, visiting the minibatches in order every epoch.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `train` - The training samples.
    /// * `val` - The validation samples, empty ones are ignored.
    /// * `log_name` - The name of the run, attached to every log record.
    ///
    /// # Returns
    /// One report per epoch, or the first error a step raises. Updates applied before the error
    /// are kept.
    pub fn run<T: Trainable + ?Sized>(
        &self,
        model: &mut T,
        train: Dataset<'_>,
        val: Option<Dataset<'_>>,
        log_name: &str,
    ) -> Result<Vec<EpochReport>> {
        let n_batches = train.n_batches(self.batch_size);
        if n_batches == 0 {
            return Err(RbmErr::InvalidConfig(format!(
                "{} training rows don't fill a single minibatch of {}",
                train.len(),
                self.batch_size
            )));
        }

        let val = val.filter(|val| !val.is_empty());
        let n_epochs = self.epochs.get();
        let start = Instant::now();
        let mut reports = Vec::with_capacity(n_epochs);

        for epoch in 0..n_epochs {
            let mut total = 0.;

            for batch in train.batches(self.batch_size, self.superbatch_size) {
                let step = model.train_step(batch).inspect_err(|e| {
                    warn!(run = log_name; "training aborted at epoch {}: {e}", epoch + 1);
                })?;
                total += step.monitoring_cost;
            }

            let val_free_energy = val
                .map(|val| model.mean_free_energy(val.view()))
                .transpose()?;

            let report = EpochReport {
                epoch,
                elapsed: start.elapsed(),
                batches: n_batches,
                loss: total / n_batches as f32,
                val_free_energy,
            };

            info!(
                run = log_name;
                "Epoch {} of {} took {:.3}s ({} minibatches)",
                epoch + 1,
                n_epochs,
                report.elapsed.as_secs_f64(),
                report.batches
            );
            info!(run = log_name; "  training loss/acc:\t\t{:.6}\t-", report.loss);

            if let Some(fe) = report.val_free_energy {
                info!(run = log_name; "  validation free energy:\t{fe:.6}");
            }

            reports.push(report);
        }

        info!(
            run = log_name;
            "Training took {:.6} minutes",
            start.elapsed().as_secs_f64() / 60.
        );

        Ok(reports)
    }
}
