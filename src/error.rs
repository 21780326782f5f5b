use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use ndarray::ShapeError;
use rand_distr::uniform::Error as UniformError;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, RbmErr>;

/// The crate's error type.
#[derive(Debug)]
pub enum RbmErr {
    /// A shape invariant was violated, e.g. a batch with the wrong amount of columns.
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A parameter list with the wrong amount of arrays was given.
    ParamCount { got: usize, expected: usize },
    /// A cost, a gradient or a parameter evaluated to NaN or infinity.
    NonFinite { what: &'static str },
    /// A training step was requested over a batch without rows.
    EmptyBatch,
    /// The configuration is semantically invalid.
    InvalidConfig(String),
    /// The configuration could not be parsed.
    Config(serde_json::Error),
    /// The weight initialization distribution could not be built.
    Init(UniformError),
    Shape(ShapeError),
    Io(io::Error),
}

impl Display for RbmErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RbmErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch for {what}: got {got}, expected {expected}"),
            RbmErr::ParamCount { got, expected } => write!(
                f,
                "the parameter list has {got} arrays, expected {expected} (weights, hidden bias, visible bias)"
            ),
            RbmErr::NonFinite { what } => write!(f, "{what} is not finite"),
            RbmErr::EmptyBatch => write!(f, "the batch has no rows"),
            RbmErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            RbmErr::Config(e) => write!(f, "failed to parse config: {e}"),
            RbmErr::Init(e) => write!(f, "failed to build the weight distribution: {e}"),
            RbmErr::Shape(e) => write!(f, "shape error: {e}"),
            RbmErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for RbmErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RbmErr::Config(e) => Some(e),
            RbmErr::Init(e) => Some(e),
            RbmErr::Shape(e) => Some(e),
            RbmErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RbmErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RbmErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}

impl From<UniformError> for RbmErr {
    fn from(value: UniformError) -> Self {
        Self::Init(value)
    }
}

impl From<ShapeError> for RbmErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

/// Boundary conversion for binaries.
impl From<RbmErr> for io::Error {
    fn from(value: RbmErr) -> Self {
        match value {
            RbmErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
