use crate::presentation::NoticeLevel;

/// Recoverable failures of a single reduction step.
///
/// None of these are fatal: the caller reports them and keeps the session.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// No file loaded, or a column role the step needs is unbound.
    #[error("missing input: {0}")]
    InputMissing(String),
    /// Non-numeric, out-of-range or order-violating parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Too few valid samples in the window for the calculation.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    /// The threshold or time range selected no rows.
    #[error("empty window: {0}")]
    DegenerateWindow(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    pub fn missing(msg: impl Into<String>) -> Self {
        AnalysisError::InputMissing(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter(msg.into())
    }

    pub fn insufficient(msg: impl Into<String>) -> Self {
        AnalysisError::InsufficientData(msg.into())
    }

    /// Notification class used when this error is shown to the user.
    pub fn level(&self) -> NoticeLevel {
        match self {
            AnalysisError::InputMissing(_) | AnalysisError::DegenerateWindow(_) => {
                NoticeLevel::Warning
            }
            AnalysisError::InvalidParameter(_) | AnalysisError::InsufficientData(_) => {
                NoticeLevel::Error
            }
        }
    }
}

/// Reject NaN and infinities for a named scalar input.
pub fn require_finite(name: &str, value: f64) -> AnalysisResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalysisError::invalid(format!("{name} must be a number")))
    }
}

/// Reject non-finite or non-positive values for a named scalar input.
pub fn require_positive(name: &str, value: f64) -> AnalysisResult<f64> {
    let value = require_finite(name, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(AnalysisError::invalid(format!("{name} must be positive")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_follow_taxonomy() {
        assert_eq!(AnalysisError::missing("x").level(), NoticeLevel::Warning);
        assert_eq!(
            AnalysisError::DegenerateWindow("x".into()).level(),
            NoticeLevel::Warning
        );
        assert_eq!(AnalysisError::invalid("x").level(), NoticeLevel::Error);
        assert_eq!(AnalysisError::insufficient("x").level(), NoticeLevel::Error);
    }

    #[test]
    fn positive_check_rejects_nan_and_zero() {
        assert!(require_positive("rho", f64::NAN).is_err());
        assert!(require_positive("rho", 0.0).is_err());
        assert_eq!(require_positive("rho", 2.5), Ok(2.5));
    }
}
