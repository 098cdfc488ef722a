use reqwest::{header, Client};
use tracing::{debug, info, warn};

use crate::auth::{CredentialStore, SessionUpdate, StoreError};
use crate::models::{RefreshRequest, RefreshedAccess};

/// Path of the token renewal endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Exchanges the stored refresh token for a fresh access token.
/// Clone is cheap - shares the connection pool and the store.
#[derive(Clone)]
pub struct CredentialRenewer {
    client: Client,
    url: String,
    store: CredentialStore,
}

impl CredentialRenewer {
    pub fn new(client: Client, base_url: &str, store: CredentialStore) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url, REFRESH_PATH),
            store,
        }
    }

    /// Try to mint a new access token.
    ///
    /// Returns `Ok(None)` when there is no refresh token or the server would
    /// not renew it, without telling those cases apart. Only storage failures
    /// are errors.
    pub async fn renew(&self) -> Result<Option<String>, StoreError> {
        let Some(refresh) = self.store.refresh_token()? else {
            debug!("No refresh token stored, skipping renewal");
            return Ok(None);
        };

        let response = match self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token renewal request failed");
                return Ok(None);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Token renewal rejected");
            return Ok(None);
        }

        let renewed: RefreshedAccess = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to parse token renewal response");
                return Ok(None);
            }
        };

        match renewed.access.filter(|token| !token.is_empty()) {
            Some(access) => {
                self.store.set(&SessionUpdate::access(access.clone()))?;
                info!("Access token renewed");
                Ok(Some(access))
            }
            None => {
                warn!("Token renewal response had no access token");
                Ok(None)
            }
        }
    }
}
