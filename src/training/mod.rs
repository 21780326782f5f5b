mod cost;
mod monitor;
mod trainer;

pub use cost::{CostEstimator, Gradient, StepResult};
pub use monitor::{PseudoLikelihood, reconstruction_cost};
pub use trainer::{EpochReport, Trainable, TrainingLoop};
