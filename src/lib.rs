pub mod arch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod initialization;
pub mod optimization;
pub mod rbm;
pub mod training;

pub use arch::{Model, ModelKind};
pub use config::{RbmConfig, n_visible_for_images};
pub use error::{RbmErr, Result};
pub use rbm::{ParamList, Rbm};
pub use training::{EpochReport, StepResult};
