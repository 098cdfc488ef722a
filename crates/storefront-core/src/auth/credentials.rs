use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::store::{KeyValueStore, StoreError};

/// One of the four persisted session entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Access,
    Refresh,
    Username,
    Privileged,
}

impl CredentialField {
    pub const ALL: [CredentialField; 4] = [
        CredentialField::Access,
        CredentialField::Refresh,
        CredentialField::Username,
        CredentialField::Privileged,
    ];

    /// Storage key for this field
    pub fn key(self) -> &'static str {
        match self {
            CredentialField::Access => "accessToken",
            CredentialField::Refresh => "refreshToken",
            CredentialField::Username => "username",
            CredentialField::Privileged => "isStaff",
        }
    }
}

/// Partial session write. Only the fields that are present get written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub username: Option<String>,
    pub is_privileged: Option<bool>,
}

impl SessionUpdate {
    pub fn access(token: impl Into<String>) -> Self {
        Self {
            access: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn privileged(is_privileged: bool) -> Self {
        Self {
            is_privileged: Some(is_privileged),
            ..Self::default()
        }
    }
}

/// Everything the store currently holds.
///
/// `username` and `is_privileged` may outlive the tokens and are display
/// state only; they must not be trusted for authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoredSession {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub username: Option<String>,
    pub is_privileged: bool,
}

/// Single source of truth for credentials.
/// Clone is cheap - the backend is shared.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn get(&self, field: CredentialField) -> Result<Option<String>, StoreError> {
        self.backend.get(field.key())
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get(CredentialField::Access)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.get(CredentialField::Refresh)
    }

    pub fn username(&self) -> Result<Option<String>, StoreError> {
        self.get(CredentialField::Username)
    }

    pub fn is_privileged(&self) -> Result<bool, StoreError> {
        Ok(self.get(CredentialField::Privileged)?.as_deref() == Some("true"))
    }

    pub fn snapshot(&self) -> Result<StoredSession, StoreError> {
        Ok(StoredSession {
            access: self.access_token()?,
            refresh: self.refresh_token()?,
            username: self.username()?,
            is_privileged: self.is_privileged()?,
        })
    }

    /// Write the non-empty string fields of `update`, and the privilege flag
    /// whenever it is given (including `false`).
    pub fn set(&self, update: &SessionUpdate) -> Result<(), StoreError> {
        let strings = [
            (CredentialField::Access, &update.access),
            (CredentialField::Refresh, &update.refresh),
            (CredentialField::Username, &update.username),
        ];
        for (field, value) in strings {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                self.backend.set(field.key(), value)?;
            }
        }
        if let Some(flag) = update.is_privileged {
            self.backend
                .set(CredentialField::Privileged.key(), if flag { "true" } else { "false" })?;
        }
        Ok(())
    }

    /// Remove all four entries. Every removal is attempted even if an earlier
    /// one fails; the first failure is returned.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for field in CredentialField::ALL {
            if let Err(e) = self.backend.remove(field.key()) {
                warn!(key = field.key(), error = %e, "Failed to remove session entry");
                first_error.get_or_insert(e);
            }
        }
        debug!("Credential store cleared");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
