//! REST API client module for the pianotutor backend.
//!
//! This module provides the `ApiClient`, which attaches the session's bearer
//! credential to each outgoing request, and `normalize`, which turns every
//! exchange into a single `RequestOutcome`.
//!
//! Responses use the `{code, msg, data}` envelope; which `code` means
//! success is set by `SuccessConvention`.

pub mod client;
pub mod envelope;
pub mod error;
pub mod models;
pub mod outcome;

pub use client::{ApiClient, ApiPaths};
pub use envelope::{Envelope, SuccessConvention};
pub use error::ApiError;
pub use models::{CredentialsRequest, LoginResponse};
pub use outcome::{normalize, RawResponse, RequestOutcome, UNAUTHORIZED_MESSAGE};
