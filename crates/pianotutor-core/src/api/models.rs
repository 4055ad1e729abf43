//! Request and response bodies for the auth endpoints.

use serde::{Deserialize, Serialize};

/// Body shared by login, register and forgot-password.
///
/// The confirmation password is checked locally and never sent.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

impl CredentialsRequest {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
}
