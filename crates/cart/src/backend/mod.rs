//! Order-submission backends.
//!
//! The cart only needs something that can create and list orders. Two
//! implementations are provided and selected by configuration:
//!
//! - [`HttpOrderBackend`] - the marketplace REST API
//! - [`LocalOrderStore`] - an in-process order log, optionally persisted to a
//!   JSON file, for running without the backend

mod http;
mod local;

#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpOrderBackend;
pub use local::LocalOrderStore;

use async_trait::async_trait;
use farmers_market_core::BuyerId;
use thiserror::Error;

use crate::order::{OrderRequest, PlacedOrder};

/// Errors that can occur when talking to an order backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading or writing the local order file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured API base URL cannot carry a path.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// The backend refused the order.
    #[error("Order rejected: {0}")]
    Rejected(String),
}

/// Creates and lists orders on behalf of the cart.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    /// Submit an order.
    async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, BackendError>;

    /// List orders, restricted to one buyer when `buyer` is given.
    async fn list_orders(&self, buyer: Option<BuyerId>) -> Result<Vec<PlacedOrder>, BackendError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = BackendError::Status {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: maintenance");
    }
}
