//! Core library for the storefront client.
//!
//! Issues HTTP requests with a bearer access token, renews the token with the
//! stored refresh token on expiry, and keeps a session projection that UI
//! front-ends can observe.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ApiRequest, AuthFallback};
pub use auth::{CredentialStore, SessionManager, SessionPhase, SessionState};
pub use config::{Config, StoreBackend};
