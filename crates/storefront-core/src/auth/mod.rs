//! Authentication module for managing credentials and the user session.
//!
//! This module provides:
//! - `KeyValueStore`: durable string storage (memory, JSON file, OS keychain)
//! - `CredentialStore`: the four persisted session entries on top of a store
//! - `SessionManager`: login/register/logout/profile with observable state

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::{CredentialField, CredentialStore, SessionUpdate, StoredSession};
pub use session::{SessionManager, SessionPhase, SessionState};
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StoreError};
