// Validation utilities module
// Provides custom validation functions for account fields

use validator::ValidationError;

/// Validates that a display name is non-empty after trimming
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::new("name_must_not_be_empty"))
    } else {
        Ok(())
    }
}

/// Validates that a password meets the minimum length requirement
/// Minimum length: 6 characters
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < 6 {
        Err(ValidationError::new("password_too_short"))
    } else {
        Ok(())
    }
}
