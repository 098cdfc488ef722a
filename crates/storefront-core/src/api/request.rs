use std::collections::BTreeMap;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// What to do when a request is still unauthorized after renewal was tried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthFallback {
    /// Clear the store and resend once without credentials, so public
    /// endpoints keep working for a user whose session lapsed.
    #[default]
    Anonymous,
    /// Clear the store and fail with [`ApiError::SessionExpired`] when
    /// renewal fails.
    Fail,
}

/// An immutable description of one API call. Retries reuse it as-is with a
/// different credential.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    path: String,
    method: Method,
    body: Option<Value>,
    headers: BTreeMap<String, String>,
    auth_fallback: AuthFallback,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            body: None,
            headers: BTreeMap::new(),
            auth_fallback: AuthFallback::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach any serializable value as the JSON body
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Body is not serializable: {}", e)))?;
        Ok(self.body(value))
    }

    /// Extra header. Overrides the pipeline's own headers on collision.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn auth_fallback(mut self, fallback: AuthFallback) -> Self {
        self.auth_fallback = fallback;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body_value(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn fallback(&self) -> AuthFallback {
        self.auth_fallback
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        let request = ApiRequest::get("/orders/");
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/orders/");
        assert!(request.body_value().is_none());
        assert!(request.headers().is_empty());
        assert_eq!(request.fallback(), AuthFallback::Anonymous);
    }

    #[test]
    fn test_builder_chain() {
        #[derive(Serialize)]
        struct Item {
            product_id: i64,
            quantity: u32,
        }

        let request = ApiRequest::post("/cart/items/")
            .json(&Item {
                product_id: 3,
                quantity: 2,
            })
            .unwrap()
            .header("X-Trace", "abc")
            .header("X-Trace", "def")
            .auth_fallback(AuthFallback::Fail);

        assert_eq!(
            request.body_value(),
            Some(&json!({"product_id": 3, "quantity": 2}))
        );
        assert_eq!(request.headers().get("X-Trace").map(String::as_str), Some("def"));
        assert_eq!(request.fallback(), AuthFallback::Fail);
    }
}
