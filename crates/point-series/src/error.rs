//! Error types for point extraction and series construction.

use thiserror::Error;

/// Errors that can occur while sampling, extracting or publishing series.
#[derive(Error, Debug)]
pub enum PointSeriesError {
    /// Latitude/longitude arrays are neither both 1-D nor both 2-D.
    #[error("unsupported grid shape: latitude is {lat_ndim}-D, longitude is {lon_ndim}-D")]
    UnsupportedGridShape { lat_ndim: usize, lon_ndim: usize },

    /// 2-D latitude/longitude arrays with different shapes.
    #[error("latitude shape {lat:?} does not match longitude shape {lon:?}")]
    GridShapeMismatch { lat: Vec<usize>, lon: Vec<usize> },

    /// A coordinate array has no finite values to compare against.
    #[error("grid has no usable points")]
    EmptyGrid,

    /// The dataset carries no data variables at all.
    #[error("dataset has no data variables")]
    NoVariables,

    /// A pinned variable name is not present in the dataset.
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// The dataset lacks a latitude or longitude coordinate.
    #[error("missing coordinate: {0}")]
    MissingCoordinate(String),

    /// Declared shape and value count disagree, or a field cannot be indexed.
    #[error("invalid field shape for '{name}': {message}")]
    FieldShape { name: String, message: String },

    /// Grid index falls outside the field.
    #[error("index {index:?} out of bounds for field '{name}' with shape {shape:?}")]
    IndexOutOfBounds {
        name: String,
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    /// The cell under the target holds a missing (non-finite) value.
    #[error("missing value in '{name}' at row {row}, col {col}")]
    MissingValue { name: String, row: usize, col: usize },

    /// A sample was appended at or before the last step of a series.
    #[error("step {step} appended after step {previous}")]
    OutOfOrderStep { step: u32, previous: u32 },

    /// The dataset source could not supply a dataset.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PointSeriesError {
    /// Create a FieldShape error.
    pub fn field_shape(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FieldShape {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a Fetch error.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type for point-series operations.
pub type Result<T> = std::result::Result<T, PointSeriesError>;
