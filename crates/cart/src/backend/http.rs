//! Marketplace REST API backend.

use std::sync::Arc;

use async_trait::async_trait;
use farmers_market_core::BuyerId;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{BackendError, OrderBackend};
use crate::config::ApiConfig;
use crate::order::{OrderRequest, PlacedOrder};

/// Longest response body excerpt kept in errors and logs.
const BODY_EXCERPT_CHARS: usize = 500;

/// Client for the marketplace order endpoints.
///
/// - `POST {base}/api/orders` creates an order
/// - `GET {base}/api/orders[?userId=N]` lists orders
#[derive(Clone)]
pub struct HttpOrderBackend {
    inner: Arc<HttpOrderBackendInner>,
}

struct HttpOrderBackendInner {
    client: reqwest::Client,
    orders_endpoint: Url,
    token: Option<SecretString>,
}

impl std::fmt::Debug for HttpOrderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOrderBackend")
            .field("orders_endpoint", &self.inner.orders_endpoint.as_str())
            .field("token", &self.inner.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpOrderBackend {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path or the HTTP
    /// client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, BackendError> {
        let orders_endpoint = orders_endpoint(&config.base_url)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpOrderBackendInner {
                client,
                orders_endpoint,
                token: config.token.clone(),
            }),
        })
    }

    /// The URL orders are posted to.
    #[must_use]
    pub fn orders_endpoint(&self) -> &Url {
        &self.inner.orders_endpoint
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode a JSON response body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&response_text),
                "Order API returned non-success status"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: excerpt(&response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&response_text),
                "Failed to parse order API response"
            );
            BackendError::Parse(e)
        })
    }
}

#[async_trait]
impl OrderBackend for HttpOrderBackend {
    #[instrument(skip_all, fields(buyer_id = %request.buyer_id, lines = request.lines.len()))]
    async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, BackendError> {
        debug!(endpoint = %self.inner.orders_endpoint, "Posting order");
        let builder = self
            .inner
            .client
            .post(self.inner.orders_endpoint.clone())
            .json(request);
        self.execute(builder).await
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, buyer: Option<BuyerId>) -> Result<Vec<PlacedOrder>, BackendError> {
        let mut url = self.inner.orders_endpoint.clone();
        if let Some(buyer) = buyer {
            url.query_pairs_mut()
                .append_pair("userId", &buyer.to_string());
        }
        let builder = self.inner.client.get(url);
        self.execute(builder).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// `{base}/api/orders`, keeping any path prefix on the base URL.
fn orders_endpoint(base: &Url) -> Result<Url, BackendError> {
    let mut endpoint = base.clone();
    endpoint
        .path_segments_mut()
        .map_err(|()| BackendError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["api", "orders"]);
    Ok(endpoint)
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn api_config(base: &str) -> ApiConfig {
        ApiConfig {
            base_url: Url::parse(base).unwrap(),
            token: Some(SecretString::from("s3cr3t-token".to_string())),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_orders_endpoint_keeps_base_path() {
        let backend = HttpOrderBackend::new(&api_config(
            "http://localhost:8080/FarmersMarketplace",
        ))
        .unwrap();
        assert_eq!(
            backend.orders_endpoint().as_str(),
            "http://localhost:8080/FarmersMarketplace/api/orders"
        );
    }

    #[test]
    fn test_orders_endpoint_with_trailing_slash() {
        let backend = HttpOrderBackend::new(&api_config("https://market.example/")).unwrap();
        assert_eq!(
            backend.orders_endpoint().as_str(),
            "https://market.example/api/orders"
        );
    }

    #[test]
    fn test_cannot_be_a_base_url_is_rejected() {
        let err = orders_endpoint(&Url::parse("mailto:orders@market.example").unwrap())
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidUrl(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let backend = HttpOrderBackend::new(&api_config("http://localhost:8080")).unwrap();
        let debug = format!("{backend:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("s3cr3t-token"));
    }

    #[test]
    fn test_excerpt_truncates() {
        let body = "x".repeat(BODY_EXCERPT_CHARS + 10);
        assert_eq!(excerpt(&body).len(), BODY_EXCERPT_CHARS);
    }
}
