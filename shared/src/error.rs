use thiserror::Error;

/// Rejected pendulum parameters.
///
/// Raised at the API boundary when a record is created or edited, and by the
/// pure math if a bad record slips through, so geometry never sees NaN.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParamError {
    #[error("length must be finite and > 0, got {0}")]
    InvalidLength(f64),

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("mass must be >= 0, got {0}")]
    NegativeMass(f64),
}

/// Check a length before it reaches the angular frequency formula.
pub fn check_length(length: f64) -> Result<f64, ParamError> {
    if length.is_finite() && length > 0.0 {
        Ok(length)
    } else {
        Err(ParamError::InvalidLength(length))
    }
}

pub fn check_finite(field: &'static str, value: f64) -> Result<f64, ParamError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParamError::NonFinite { field, value })
    }
}

pub fn check_mass(mass: f64) -> Result<f64, ParamError> {
    check_finite("mass", mass)?;
    if mass < 0.0 {
        return Err(ParamError::NegativeMass(mass));
    }
    Ok(mass)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_length_accepted() {
        assert_eq!(check_length(2.0), Ok(2.0));
    }

    #[test]
    fn zero_and_negative_length_rejected() {
        assert_eq!(check_length(0.0), Err(ParamError::InvalidLength(0.0)));
        assert_eq!(check_length(-1.5), Err(ParamError::InvalidLength(-1.5)));
    }

    #[test]
    fn infinite_length_rejected() {
        assert!(check_length(f64::INFINITY).is_err());
        assert!(check_length(f64::NAN).is_err());
    }

    #[test]
    fn negative_mass_rejected() {
        assert_eq!(check_mass(-0.1), Err(ParamError::NegativeMass(-0.1)));
        assert_eq!(check_mass(0.0), Ok(0.0));
    }

    #[test]
    fn error_message_names_field() {
        let err = check_finite("theta", f64::NAN).unwrap_err();
        assert!(err.to_string().starts_with("theta must be a finite number"));
    }
}
