//! API client for communicating with the pianotutor REST API.
//!
//! Every request passes through `auth_headers`, which asks the session store
//! for a valid token and attaches it as a bearer credential. Requests without
//! a token go out unmodified; reporting missing authorization is the
//! server's job. A 401 clears the session only if it is still the one the
//! request was sent with. There is no retry and no backoff: one request, one
//! outcome.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::envelope::SuccessConvention;
use super::outcome::{normalize, RawResponse, RequestOutcome};
use super::ApiError;
use crate::auth::{SessionSnapshot, SessionStore};
use crate::config::Config;

/// Endpoint paths, relative to the configured base URL
pub struct ApiPaths;

impl ApiPaths {
    pub const LOGIN: &'static str = "users/auth/login";
    pub const REGISTER: &'static str = "users/auth/register";
    pub const FORGOT_PASSWORD: &'static str = "users/auth/forgot-password";
    pub const LOGOUT: &'static str = "users/auth/logout";
}

/// API client for the pianotutor backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    convention: SuccessConvention,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a new API client reading tokens from `session`
    pub fn new(config: &Config, session: Arc<SessionStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            convention: config.success_convention,
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Bearer credential for the current session, or nothing.
    ///
    /// Never fails: a token that cannot be encoded as a header value is
    /// dropped and the request is sent without it. The returned snapshot is
    /// the session the credential came from, present only when one was
    /// attached.
    fn auth_headers(&self) -> (header::HeaderMap, Option<Arc<SessionSnapshot>>) {
        let mut headers = header::HeaderMap::new();
        let Some((token, sent_with)) = self.session.credential() else {
            return (headers, None);
        };
        match header::HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(header::AUTHORIZATION, value);
                (headers, Some(sent_with))
            }
            Err(e) => {
                warn!(error = %e, "Session token is not a valid header value, sending without it");
                (headers, None)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> (RequestBuilder, Option<Arc<SessionSnapshot>>) {
        let (headers, sent_with) = self.auth_headers();
        (self.public_request(method, path).headers(headers), sent_with)
    }

    fn public_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json")
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        sent_with: Option<Arc<SessionSnapshot>>,
        path: &str,
    ) -> RequestOutcome<T> {
        let exchange = match request.send().await {
            Ok(response) => RawResponse::read(response).await,
            Err(e) => Err(ApiError::NetworkError(e)),
        };

        match &exchange {
            Ok(raw) => debug!(path, status = raw.status.as_u16(), "Response received"),
            Err(e) => debug!(path, error = %e, "Request failed before a response arrived"),
        }

        let outcome = normalize(exchange, self.convention);
        if outcome.is_unauthorized() {
            // Only the session that authorized this request is rejected
            match sent_with {
                Some(snapshot) => {
                    if self.session.clear_if_current(&snapshot).await {
                        warn!(path, "Server rejected the credential, session cleared");
                    }
                }
                None => debug!(path, "Unauthorized response to a request without a credential"),
            }
        }
        outcome
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> RequestOutcome<T> {
        debug!(path, "GET");
        let (request, sent_with) = self.request(Method::GET, path);
        self.execute(request, sent_with, path).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> RequestOutcome<T> {
        debug!(path, "POST");
        let (request, sent_with) = self.request(Method::POST, path);
        self.execute(request.json(body), sent_with, path).await
    }

    /// POST that carries its own credentials in the body (login, register,
    /// password reset). No bearer is attached, so a 401 here leaves the
    /// stored session alone.
    pub async fn post_public<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> RequestOutcome<T> {
        debug!(path, "POST");
        let request = self.public_request(Method::POST, path).json(body);
        self.execute(request, None, path).await
    }

    /// POST without a request body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> RequestOutcome<T> {
        debug!(path, "POST");
        let (request, sent_with) = self.request(Method::POST, path);
        self.execute(request, sent_with, path).await
    }
}
