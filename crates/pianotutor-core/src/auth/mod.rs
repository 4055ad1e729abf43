//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: cached token with durable backing and expiry
//! - `AuthService`: login, register, password reset and logout flows
//! - Local credential validation run before any request is sent
//!
//! Tokens expire 7 days after they are stored unless configured otherwise.

pub mod service;
pub mod session;
pub mod validation;

use thiserror::Error;

use crate::api::ApiError;

pub use service::AuthService;
pub use session::{ExpiryPolicy, SessionSnapshot, SessionStore};
pub use validation::ValidationError;

/// Why an auth flow did not complete.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message} (code {code})")]
    Business { code: i32, message: String },

    #[error(transparent)]
    Transport(#[from] ApiError),
}

impl AuthError {
    /// Text suitable for a transient notification.
    ///
    /// Validation and server messages are shown as-is; transport failures
    /// get a generic prefix.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(e) => e.to_string(),
            AuthError::Business { message, .. } => message.clone(),
            AuthError::Transport(e) => format!("Request failed: {}", e),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AuthError::Business { code: 401, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AuthError::from(ValidationError::PasswordMismatch).user_message(),
            "Passwords do not match"
        );
        assert_eq!(
            AuthError::Business {
                code: 500,
                message: "invalid credentials".to_string()
            }
            .user_message(),
            "invalid credentials"
        );
        assert_eq!(
            AuthError::from(ApiError::EmptyBody).user_message(),
            "Request failed: Response body is empty"
        );
    }

    #[test]
    fn test_is_unauthorized() {
        let err = AuthError::Business {
            code: 401,
            message: String::new(),
        };
        assert!(err.is_unauthorized());
        assert!(!AuthError::from(ApiError::EmptyData).is_unauthorized());
    }
}
