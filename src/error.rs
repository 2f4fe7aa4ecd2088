//! Error taxonomy for the graph and interpolation code.
//!
//! Every validation error is raised at the API boundary before any numeric
//! work starts. Numeric singularities during interpolation are *not* errors:
//! they are reported as [`SingularSystemWarning`](crate::interpolate::SingularSystemWarning)
//! values alongside a complete result.

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Malformed, empty or non-finite input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Non-positive or non-finite epsilon / sigma (or other tuning knob).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Shape disagreement between two collaborating arrays.
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

impl Error {
    pub(crate) fn input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub(crate) fn param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }
}
