use thiserror::Error;

/// Failures raised by the numerical core. The same input always fails the
/// same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A logarithm was requested of a non-positive block mean or variance.
    #[error("cannot take log of {quantity} {value} at aggregation scale {scale}")]
    NumericalDomain {
        quantity: &'static str,
        scale: usize,
        value: f64,
    },

    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

impl AnalysisError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
