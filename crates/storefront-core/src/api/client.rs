//! API client for the storefront REST API.
//!
//! `ApiClient::send` is the single entry point for every call. It attaches the
//! stored bearer token, renews it once on a 401, and falls back to one
//! anonymous attempt when the session cannot be renewed.

use std::time::Duration;

use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Client, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::CredentialStore;
use crate::models::{
    Cart, CartItem, CartItemUpdate, NewCartItem, Order, Product,
};

use super::{ApiError, ApiRequest, AuthFallback, CredentialRenewer};

// ============================================================================
// Constants
// ============================================================================

/// Default API base URL when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Transport timeout. The pipeline itself adds no deadline on top.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the storefront.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: CredentialStore,
    renewer: CredentialRenewer,
}

impl ApiClient {
    /// Create a new API client against `base_url` (trailing `/` is ignored)
    pub fn new(base_url: &str, store: CredentialStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, base_url, store))
    }

    /// Build on an existing reqwest client, sharing its connection pool
    pub fn with_client(client: Client, base_url: &str, store: CredentialStore) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let renewer = CredentialRenewer::new(client.clone(), &base_url, store.clone());
        Self {
            client,
            base_url,
            store,
            renewer,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Send a request through the renew-and-retry pipeline.
    ///
    /// Resolves to the parsed JSON body, or `None` for a no-content response.
    /// At most three resource calls are made: the first attempt, one retry with a
    /// renewed token, and one anonymous retry.
    pub async fn send(&self, request: &ApiRequest) -> Result<Option<Value>, ApiError> {
        let token = self.store.access_token()?;
        let mut response = self.execute(request, token.as_deref(), 1).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.store.refresh_token()?.is_some() {
            match self.renewer.renew().await? {
                Some(fresh) => {
                    response = self.execute(request, Some(&fresh), 2).await?;
                }
                None => {
                    warn!(path = request.path(), "Session could not be renewed, clearing credentials");
                    self.store.clear()?;
                    if request.fallback() == AuthFallback::Fail {
                        return Err(ApiError::SessionExpired);
                    }
                }
            }
        }

        if response.status() == StatusCode::UNAUTHORIZED
            && request.fallback() == AuthFallback::Anonymous
        {
            info!(path = request.path(), "Still unauthorized, retrying anonymously");
            self.store.clear()?;
            response = self.execute(request, None, 3).await?;
        }

        Self::read_body(response).await
    }

    /// Send a request and decode the body into `T`.
    /// A no-content response decodes from JSON `null`, so `T = ()` works.
    pub async fn send_as<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let body = self.send(request).await?.unwrap_or(Value::Null);
        serde_json::from_value(body).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "Unexpected response shape from {}: {}",
                request.path(),
                e
            ))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_as(&ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_as(&ApiRequest::post(path).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_as(&ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_as(&ApiRequest::delete(path)).await
    }

    fn build_headers(request: &ApiRequest, token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(token) = token {
            headers.insert(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::InvalidRequest("Access token is not a valid header value".into()))?,
            );
        }
        for (name, value) in request.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::InvalidRequest(format!("Invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ApiError::InvalidRequest(format!("Invalid value for header {}", name)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
        attempt: u32,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path());
        let method = request.method().clone();

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(Self::build_headers(request, token)?);
        if let Some(body) = request.body_value() {
            builder = builder.json(body);
        }

        debug!(attempt, %method, url = %url, authenticated = token.is_some(), "Sending API request");
        let response = builder.send().await?;
        debug!(attempt, %method, url = %url, status = %response.status(), "Received API response");
        Ok(response)
    }

    async fn read_body(response: Response) -> Result<Option<Value>, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let err = ApiError::from_response(response).await;
            warn!(%status, error = %err, "API request failed");
            return Err(err);
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ApiError::InvalidResponse(format!("Response is not JSON: {}", e)))
    }

    // ===== Resource Calls =====

    /// List active products. Public, so it works without a session.
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.get("/products/").await
    }

    pub async fn fetch_cart(&self) -> Result<Cart, ApiError> {
        self.get("/cart/").await
    }

    pub async fn add_to_cart(&self, product_id: i64, quantity: u32) -> Result<CartItem, ApiError> {
        self.post("/cart/items/", &NewCartItem { product_id, quantity })
            .await
    }

    pub async fn update_cart_item(&self, item_id: i64, quantity: u32) -> Result<CartItem, ApiError> {
        self.patch(&format!("/cart/items/{}/", item_id), &CartItemUpdate { quantity })
            .await
    }

    pub async fn remove_cart_item(&self, item_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/cart/items/{}/", item_id)).await
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get("/orders/").await
    }

    /// Check out the current cart
    pub async fn place_order(&self) -> Result<Order, ApiError> {
        self.send_as(&ApiRequest::post("/orders/")).await
    }

    pub async fn pay_order(&self, order_id: i64) -> Result<Order, ApiError> {
        self.send_as(&ApiRequest::post(format!("/orders/{}/pay/", order_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::MemoryStore;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        let client = ApiClient::new("http://example.test/api/", store).unwrap();
        assert_eq!(client.base_url(), "http://example.test/api");
    }

    #[test]
    fn test_extra_headers_override_defaults() {
        let request = ApiRequest::get("/x/")
            .header("Content-Type", "text/plain")
            .header("X-Client", "cli");
        let headers = ApiClient::build_headers(&request, Some("tok")).unwrap();

        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(headers.get("x-client").unwrap(), "cli");
    }

    #[test]
    fn test_no_authorization_without_token() {
        let headers = ApiClient::build_headers(&ApiRequest::get("/x/"), None).unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let request = ApiRequest::get("/x/").header("bad header", "v");
        assert!(matches!(
            ApiClient::build_headers(&request, None),
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
