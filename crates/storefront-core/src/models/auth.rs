use serde::{Deserialize, Serialize};

/// Body of `POST /auth/token/`
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Token pair issued on login
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body of `POST /auth/token/refresh/`
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Response of the renewal endpoint. `access` may be missing on odd servers,
/// which counts as a failed renewal rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshedAccess {
    #[serde(default)]
    pub access: Option<String>,
}

/// New account request for `POST /register/`
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Authenticated user as reported by `GET /auth/me/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults_missing_flags() {
        let profile: Profile = serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert_eq!(profile.username, "bob");
        assert!(!profile.is_staff);
        assert!(!profile.is_superuser);
    }

    #[test]
    fn test_refreshed_access_tolerates_missing_access() {
        let empty: RefreshedAccess = serde_json::from_str("{}").unwrap();
        assert!(empty.access.is_none());

        let full: RefreshedAccess = serde_json::from_str(r#"{"access": "new"}"#).unwrap();
        assert_eq!(full.access.as_deref(), Some("new"));
    }

    #[test]
    fn test_token_pair_requires_both_tokens() {
        assert!(serde_json::from_str::<TokenPair>(r#"{"access": "a"}"#).is_err());
    }
}
