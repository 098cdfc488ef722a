//! REST API client module for the storefront service.
//!
//! This module provides the `ApiClient` request pipeline, the
//! `CredentialRenewer` that exchanges refresh tokens for access tokens, and
//! the `ApiError` taxonomy with its error-message extraction.
//!
//! The API uses JWT bearer token authentication obtained from
//! `POST /auth/token/`.

pub mod client;
pub mod error;
pub mod renew;
pub mod request;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::{extract_message, ApiError};
pub use renew::CredentialRenewer;
pub use request::{ApiRequest, AuthFallback};
