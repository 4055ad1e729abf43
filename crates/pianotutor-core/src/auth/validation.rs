//! Checks run before a request is dispatched.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username and password required")]
    MissingCredentials,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("Password cannot be empty")]
    EmptyPassword,
}

/// Login only needs both fields present.
pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    Ok(())
}

/// Register and password reset: confirmation first, then blank fields.
pub fn validate_new_password(
    username: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if username.trim().is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    if password.trim().is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_login() {
        assert_eq!(validate_login("ada", "pw"), Ok(()));
        assert_eq!(validate_login("", "pw"), Err(ValidationError::MissingCredentials));
        assert_eq!(validate_login("  ", "pw"), Err(ValidationError::MissingCredentials));
        assert_eq!(validate_login("ada", ""), Err(ValidationError::MissingCredentials));
    }

    #[test]
    fn test_mismatch_checked_first() {
        // Empty username and mismatched passwords: mismatch wins
        assert_eq!(
            validate_new_password("", "a", "b"),
            Err(ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn test_blank_fields() {
        assert_eq!(
            validate_new_password(" ", "pw", "pw"),
            Err(ValidationError::EmptyUsername)
        );
        assert_eq!(
            validate_new_password("ada", "   ", "   "),
            Err(ValidationError::EmptyPassword)
        );
        assert_eq!(validate_new_password("ada", "pw", "pw"), Ok(()));
    }
}
