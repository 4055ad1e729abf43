//! Login, registration, password reset and logout.
//!
//! Each flow validates locally, makes one request through the `ApiClient`,
//! and returns the result directly. Only login and logout touch the session
//! store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::validation::{validate_login, validate_new_password};
use super::{AuthError, SessionStore};
use crate::api::{ApiClient, ApiError, ApiPaths, CredentialsRequest, LoginResponse, RequestOutcome};
use crate::config::Config;
use crate::storage::KeyValueStore;

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Load the session from `storage` and build a client around it
    pub async fn connect(config: &Config, storage: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let session = SessionStore::open(storage, config.expiry_policy()).await;
        let api = ApiClient::new(config, session)?;
        Ok(Self::new(api))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.api.session()
    }

    /// Authenticate and store the returned token
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        validate_login(username, password)?;

        let response: LoginResponse = self
            .api
            .post_public(ApiPaths::LOGIN, &CredentialsRequest::new(username.trim(), password))
            .await
            .into_result()?;

        self.session().write(Some(response.token.clone())).await;
        info!(username = username.trim(), "Login successful");
        Ok(response)
    }

    /// Create an account. Does not sign in.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<String, AuthError> {
        validate_new_password(username, password, confirm_password)?;

        let message: String = self
            .api
            .post_public(ApiPaths::REGISTER, &CredentialsRequest::new(username.trim(), password))
            .await
            .into_result()?;

        info!(username = username.trim(), "Registration successful");
        Ok(message)
    }

    /// Set a new password for `username`
    pub async fn forgot_password(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<String, AuthError> {
        validate_new_password(username, password, confirm_password)?;

        let message: String = self
            .api
            .post_public(
                ApiPaths::FORGOT_PASSWORD,
                &CredentialsRequest::new(username.trim(), password),
            )
            .await
            .into_result()?;

        debug!(username = username.trim(), "Password reset accepted");
        Ok(message)
    }

    /// Tell the server the session is over, then clear it locally no matter
    /// what the server said. The server's error, if any, is still returned.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let result = match self.api.post_empty::<serde_json::Value>(ApiPaths::LOGOUT).await {
            // Logout carries no payload; a successful envelope without data is fine
            RequestOutcome::TransportError(ApiError::EmptyData) => Ok(()),
            outcome => outcome.into_result().map(|_| ()),
        };

        self.session().clear().await;

        match result {
            Ok(()) => {
                info!("Logout successful");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout request failed, local session cleared anyway");
                Err(e)
            }
        }
    }
}
