use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use rand_distr::{NormalError, uniform::Error as UniformError};
use safetensors::SafeTensorError;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The crate's error type.
#[derive(Debug)]
pub enum MlErr {
    Io(io::Error),
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    LayerDimMismatch {
        layer: usize,
        got: usize,
        expected: usize,
    },
    EmptyModel,
    InvalidIdx {
        path: String,
        reason: String,
    },
    LabelOutOfRange {
        label: usize,
        classes: usize,
    },
    MissingTensor {
        name: String,
    },
    TensorShapeMismatch {
        name: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    UnsupportedDtype {
        name: String,
    },
    InvalidArtifact(String),
    MissingInput {
        name: String,
    },
    InvalidConfig(String),
    Distribution(String),
    SafeTensors(SafeTensorError),
    Json(serde_json::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::Io(e) => write!(f, "io error: {e}"),
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch for {what}, got {got} and expected {expected}"
            ),
            MlErr::LayerDimMismatch {
                layer,
                got,
                expected,
            } => write!(
                f,
                "Layer {layer} takes inputs of width {got} but the previous stage yields {expected}"
            ),
            MlErr::EmptyModel => write!(f, "The model has no layers"),
            MlErr::InvalidIdx { path, reason } => write!(f, "invalid idx file {path}: {reason}"),
            MlErr::LabelOutOfRange { label, classes } => {
                write!(f, "label {label} is out of range for {classes} classes")
            }
            MlErr::MissingTensor { name } => write!(f, "missing tensor `{name}`"),
            MlErr::TensorShapeMismatch {
                name,
                got,
                expected,
            } => write!(
                f,
                "tensor `{name}` has shape {got:?}, expected {expected:?}"
            ),
            MlErr::UnsupportedDtype { name } => write!(f, "tensor `{name}` is not f32"),
            MlErr::InvalidArtifact(msg) => write!(f, "invalid artifact: {msg}"),
            MlErr::MissingInput { name } => write!(f, "missing input `{name}`"),
            MlErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            MlErr::Distribution(msg) => write!(f, "invalid distribution: {msg}"),
            MlErr::SafeTensors(e) => write!(f, "safetensors error: {e:?}"),
            MlErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io(e) => Some(e),
            MlErr::Json(e) => Some(e),
            MlErr::SafeTensors(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SafeTensorError> for MlErr {
    fn from(value: SafeTensorError) -> Self {
        Self::SafeTensors(value)
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<NormalError> for MlErr {
    fn from(value: NormalError) -> Self {
        Self::Distribution(value.to_string())
    }
}

impl From<UniformError> for MlErr {
    fn from(value: UniformError) -> Self {
        Self::Distribution(value.to_string())
    }
}
