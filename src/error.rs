use core::fmt;

/// Result alias for `hails`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by decomposition, forecasting and aggregation primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty.
    EmptyInput,

    /// Moving-average kernel size is even or zero.
    InvalidKernelSize {
        /// Requested kernel size.
        kernel_size: usize,
    },

    /// Input channel count differs from the per-channel weight tensor.
    ChannelCountMismatch {
        /// Channels the weights were built for.
        expected: usize,
        /// Channels found in the input window.
        found: usize,
    },

    /// No hierarchy column is left to key the rows by.
    MissingHierarchyColumn {
        /// Finest hierarchy column at the point the key came up empty.
        column: String,
    },

    /// Dimension mismatch (usize).
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Shape mismatch (string description).
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// Matrix inversion failure.
    InversionFailed,

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// Generic error with message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::InvalidKernelSize { kernel_size } => {
                write!(f, "kernel size must be odd and positive, got {kernel_size}")
            }
            Error::ChannelCountMismatch { expected, found } => {
                write!(f, "channel count mismatch: weights hold {expected}, input has {found}")
            }
            Error::MissingHierarchyColumn { column } => {
                write!(f, "no usable grouping columns at hierarchy column '{column}'")
            }
            Error::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Error::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, actual {actual}")
            }
            Error::InversionFailed => write!(f, "matrix inversion failed"),
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ndarray::ShapeError> for Error {
    fn from(e: ndarray::ShapeError) -> Self {
        Error::Other(e.to_string())
    }
}
