mod sigmoid;

pub use sigmoid::{log_sigmoid, sigmoid, softplus};
