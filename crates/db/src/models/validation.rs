use thiserror::Error;

/// Rejections raised before any query or provider call is made.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} é obrigatório")]
    Required(&'static str),
    #[error("{field} deve estar entre {min} e {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{0} não pode ser negativo")]
    Negative(&'static str),
    #[error("{0}")]
    Invalid(String),
}

pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

pub fn non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::Negative(field));
    }
    Ok(())
}

pub fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(require("nome", "  "), Err(ValidationError::Required("nome")));
        assert!(require("nome", "Ana").is_ok());
    }

    #[test]
    fn test_in_range_rejects_nan() {
        assert!(in_range("percentual", f64::NAN, 0.0, 100.0).is_err());
        assert!(in_range("percentual", 100.0, 0.0, 100.0).is_ok());
        assert!(in_range("percentual", 100.5, 0.0, 100.0).is_err());
    }
}
