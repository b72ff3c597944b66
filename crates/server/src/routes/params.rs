//! Query-string shapes and input checks shared by the handlers.

use serde::Deserialize;

use crate::error::AppError;

/// `?id=` on get/delete routes.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdQuery<T> {
    pub id: T,
}

/// Reject a body whose required fields are blank.
///
/// # Errors
///
/// Returns `AppError::Validation` naming every missing field.
pub fn require_fields(missing: &[&str]) -> Result<(), AppError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Trimmed, non-empty text or a validation error naming `field`.
///
/// # Errors
///
/// Returns `AppError::Validation` if the value is blank.
pub fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AppError::Validation(format!("{field} is required")))
    } else {
        Ok(value.to_owned())
    }
}

/// # Errors
///
/// Returns `AppError::Validation` unless `value` is greater than zero.
pub fn require_positive(value: i64, field: &str) -> Result<(), AppError> {
    if value > 0 {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{field} must be a positive id")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_fields_names_all_missing() {
        assert!(require_fields(&[]).is_ok());
        let err = require_fields(&["anrede", "plz"]).err();
        assert!(matches!(
            err,
            Some(AppError::Validation(ref m)) if m == "missing required fields: anrede, plz"
        ));
    }

    #[test]
    fn test_required_text_trims() {
        assert!(matches!(required_text("  viewer ", "name").as_deref(), Ok("viewer")));
        assert!(required_text("   ", "name").is_err());
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive(1, "role_id").is_ok());
        assert!(require_positive(0, "role_id").is_err());
        assert!(require_positive(-4, "role_id").is_err());
    }
}
