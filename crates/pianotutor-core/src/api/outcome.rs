//! Response normalization.
//!
//! Every exchange ends in exactly one `RequestOutcome`. The checks run in a
//! fixed order so that transport failures (nothing interpretable came back)
//! stay distinct from business failures (the server said no). Callers rely
//! on that split: business and auth failures may clear the session, while
//! transport failures are only reported.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::envelope::{Envelope, SuccessConvention};
use super::ApiError;
use crate::auth::AuthError;

/// Message reported for HTTP 401
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized, please sign in again";

/// Status and body of a completed exchange, before interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Drain a reqwest response. Failing to read the body is a transport error.
    pub async fn read(response: reqwest::Response) -> Result<Self, ApiError> {
        let status = response.status();
        let body = response.bytes().await?;
        Ok(Self::new(status, body.to_vec()))
    }
}

#[derive(Debug)]
pub enum RequestOutcome<T> {
    Success(T),
    BusinessError { code: i32, message: String },
    TransportError(ApiError),
}

impl<T> RequestOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    /// Server rejected the credential
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RequestOutcome::BusinessError { code: 401, .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RequestOutcome<U> {
        match self {
            RequestOutcome::Success(data) => RequestOutcome::Success(f(data)),
            RequestOutcome::BusinessError { code, message } => {
                RequestOutcome::BusinessError { code, message }
            }
            RequestOutcome::TransportError(e) => RequestOutcome::TransportError(e),
        }
    }

    pub fn into_result(self) -> Result<T, AuthError> {
        match self {
            RequestOutcome::Success(data) => Ok(data),
            RequestOutcome::BusinessError { code, message } => {
                Err(AuthError::Business { code, message })
            }
            RequestOutcome::TransportError(e) => Err(AuthError::Transport(e)),
        }
    }
}

/// Best-effort message for a non-2xx response
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if status == StatusCode::UNAUTHORIZED {
        return UNAUTHORIZED_MESSAGE.to_string();
    }
    if let Ok(envelope) = serde_json::from_slice::<Envelope<serde_json::Value>>(body) {
        if !envelope.msg.is_empty() {
            return envelope.msg;
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return ApiError::truncate_body(text);
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

fn is_empty_body(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    text.is_empty() || text == "null"
}

/// Interpret one exchange. Never panics, never errors: every path ends in
/// a `RequestOutcome`.
pub fn normalize<T: DeserializeOwned>(
    exchange: Result<RawResponse, ApiError>,
    convention: SuccessConvention,
) -> RequestOutcome<T> {
    let response = match exchange {
        Ok(response) => response,
        Err(e) => return RequestOutcome::TransportError(e),
    };

    if !response.status.is_success() {
        return RequestOutcome::BusinessError {
            code: i32::from(response.status.as_u16()),
            message: error_message(response.status, &response.body),
        };
    }

    if is_empty_body(&response.body) {
        return RequestOutcome::TransportError(ApiError::EmptyBody);
    }

    let envelope: Envelope<T> = match serde_json::from_slice(&response.body) {
        Ok(envelope) => envelope,
        Err(e) => return RequestOutcome::TransportError(ApiError::DecodeError(e)),
    };

    if !envelope.is_success(convention) {
        return RequestOutcome::BusinessError {
            code: envelope.code,
            message: envelope.msg,
        };
    }

    match envelope.data {
        Some(data) => RequestOutcome::Success(data),
        None => RequestOutcome::TransportError(ApiError::EmptyData),
    }
}
