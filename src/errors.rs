//! Error types and validation functions for the analytics engine.
//!
//! Every analysis either returns a complete result or fails with an
//! [`AnalyticsError`]. Variants carry structured fields so callers (the HTTP
//! layer in particular) can build user-facing messages without parsing text.

use thiserror::Error;

/// Comprehensive error type for analytics operations.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AnalyticsError {
    /// Insufficient data for the requested analysis.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Two inputs that must be aligned have different lengths.
    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch {
        /// Length of the reference input
        expected: usize,
        /// Length of the mismatching input
        actual: usize,
    },

    /// Input contains NaN or an infinite value.
    #[error("{name} contains a non-finite value at index {index}")]
    NonFiniteInput {
        /// Name of the offending input
        name: String,
        /// Index of the first non-finite value
        index: usize,
    },

    /// Input is well-formed numerically but unusable for the analysis.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected
        reason: String,
    },

    /// Invalid parameter value, typically a configuration field.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Regression design matrix is rank-deficient within the configured tolerance.
    #[error("Singular design matrix: numerical rank {rank} < {columns} columns")]
    SingularMatrix {
        /// Numerical rank detected during factorization
        rank: usize,
        /// Number of design columns, intercept included
        columns: usize,
    },

    /// Iterative routine hit the iteration bound before meeting the tolerance.
    #[error("{routine} did not converge within {iterations} iterations")]
    ConvergenceFailure {
        /// Routine that failed to converge
        routine: String,
        /// Iteration bound that was exhausted
        iterations: usize,
    },

    /// Numerical computation failed (distribution construction, overflow).
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
        /// Operation that failed
        operation: Option<String>,
    },
}

/// Coarse classification of [`AnalyticsError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or insufficient input
    Validation,
    /// Design matrix not invertible within tolerance
    SingularMatrix,
    /// Iterative routine exceeded its iteration bound
    Convergence,
    /// Internal numerical failure
    Numerical,
}

impl AnalyticsError {
    /// Classify the error for callers that only distinguish the broad kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyticsError::InsufficientData { .. }
            | AnalyticsError::LengthMismatch { .. }
            | AnalyticsError::NonFiniteInput { .. }
            | AnalyticsError::InvalidInput { .. }
            | AnalyticsError::InvalidParameter { .. } => ErrorKind::Validation,
            AnalyticsError::SingularMatrix { .. } => ErrorKind::SingularMatrix,
            AnalyticsError::ConvergenceFailure { .. } => ErrorKind::Convergence,
            AnalyticsError::NumericalError { .. } => ErrorKind::Numerical,
        }
    }

    /// True for malformed or insufficient input.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub(crate) fn numerical(reason: impl Into<String>, operation: &str) -> Self {
        AnalyticsError::NumericalError {
            reason: reason.into(),
            operation: Some(operation.to_string()),
        }
    }
}

/// Result type for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Validates that data has sufficient length for analysis.
///
/// # Example
/// ```rust
/// use insight_analytics::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2).is_ok());
/// assert!(validate_data_length(&data, 5).is_err());
/// ```
pub fn validate_data_length(data: &[f64], min_required: usize) -> AnalyticsResult<()> {
    if data.len() < min_required {
        Err(AnalyticsError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that two inputs have the same length.
pub fn validate_equal_length(expected: &[f64], actual: &[f64]) -> AnalyticsResult<()> {
    if expected.len() != actual.len() {
        return Err(AnalyticsError::LengthMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    Ok(())
}

/// Validates that a parameter is within the closed range `[min, max]`.
///
/// # Example
/// ```rust
/// use insight_analytics::errors::validate_parameter;
///
/// assert!(validate_parameter(0.05, 0.0, 1.0, "significance_level").is_ok());
/// assert!(validate_parameter(1.5, 0.0, 1.0, "significance_level").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> AnalyticsResult<()> {
    if value.is_nan() {
        return Err(AnalyticsError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if min.is_nan() || max.is_nan() || min > max {
        return Err(AnalyticsError::numerical(
            format!("Invalid bounds for parameter {}: min={}, max={}", name, min, max),
            "validate_parameter",
        ));
    }

    if value < min || value > max {
        Err(AnalyticsError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that a probability-like parameter lies in the open interval `(0, 1)`.
pub fn validate_open_unit(value: f64, name: &str) -> AnalyticsResult<()> {
    if value.is_nan() || value <= 0.0 || value >= 1.0 {
        return Err(AnalyticsError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "(0, 1)".to_string(),
        });
    }
    Ok(())
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first NaN or infinite value.
///
/// # Example
/// ```rust
/// use insight_analytics::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0, 3.0], "sample").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN, 3.0], "sample").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> AnalyticsResult<()> {
    if let Some(index) = data.iter().position(|v| !v.is_finite()) {
        return Err(AnalyticsError::NonFiniteInput {
            name: name.to_string(),
            index,
        });
    }
    Ok(())
}
