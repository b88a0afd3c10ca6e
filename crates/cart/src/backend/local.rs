//! Local order log used when the marketplace API is not available.
//!
//! Orders live in memory and, when a path is configured, are mirrored to a
//! JSON file (an array of [`PlacedOrder`]) after every write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use farmers_market_core::{BuyerId, OrderId, Price};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::{BackendError, OrderBackend};
use crate::order::{OrderRequest, PlacedOrder};

/// In-process order backend with optional file persistence.
#[derive(Debug)]
pub struct LocalOrderStore {
    path: Option<PathBuf>,
    orders: Mutex<Vec<PlacedOrder>>,
}

impl LocalOrderStore {
    /// Create a store that keeps orders in memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            orders: Mutex::new(Vec::new()),
        }
    }

    /// Open a store backed by `path`.
    ///
    /// A missing file starts an empty log; the file is created on the first
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref().to_path_buf();
        let orders = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(orders = orders.len(), "Local order store loaded");

        Ok(Self {
            path: Some(path),
            orders: Mutex::new(orders),
        })
    }

    /// The backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, orders: &[PlacedOrder]) -> Result<(), BackendError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(orders)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderBackend for LocalOrderStore {
    #[instrument(skip_all, fields(buyer_id = %request.buyer_id))]
    async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, BackendError> {
        validate(request)?;
        let mut orders = self.orders.lock().await;

        let next_id = orders
            .iter()
            .map(|o| o.id.as_i32())
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| BackendError::Rejected("order ids exhausted".to_string()))?;
        let order = PlacedOrder::from_request(OrderId::new(next_id), request, Utc::now());
        orders.push(order.clone());

        if let Err(e) = self.persist(&orders).await {
            orders.pop();
            return Err(e);
        }

        info!(order_id = %order.id, "Order recorded locally");
        Ok(order)
    }

    async fn list_orders(&self, buyer: Option<BuyerId>) -> Result<Vec<PlacedOrder>, BackendError> {
        let orders = self.orders.lock().await;
        Ok(orders
            .iter()
            .filter(|order| buyer.is_none_or(|id| order.buyer_id == id))
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

fn validate(request: &OrderRequest) -> Result<(), BackendError> {
    if request.lines.is_empty() {
        return Err(BackendError::Rejected("order has no items".to_string()));
    }
    let computed = request
        .lines
        .iter()
        .map(|line| line.unit_price.checked_times(line.quantity))
        .collect::<Option<Vec<Price>>>()
        .and_then(Price::checked_sum)
        .ok_or_else(|| BackendError::Rejected("order total is too large".to_string()))?;
    if computed != request.total_amount {
        return Err(BackendError::Rejected(format!(
            "total {} does not match items ({computed})",
            request.total_amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use farmers_market_core::{OrderStatus, ProductId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::order::OrderLineRequest;

    fn request(buyer: i32, quantity: u32) -> OrderRequest {
        let unit_price = Price::new(Decimal::from(45));
        OrderRequest {
            buyer_id: BuyerId::new(buyer),
            total_amount: unit_price.times(quantity),
            lines: vec![OrderLineRequest {
                product_id: ProductId::new(3),
                product_name: "Carrots".to_string(),
                quantity,
                unit_price,
                category: "Vegetables".to_string(),
                farmer_id: None,
                farmer_name: "Unknown Farmer".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_assigns_sequential_ids() {
        let store = LocalOrderStore::in_memory();

        let first = store.create_order(&request(2, 1)).await.unwrap();
        let second = store.create_order(&request(2, 3)).await.unwrap();

        assert_eq!(first.id, OrderId::new(1));
        assert_eq!(second.id, OrderId::new(2));
        assert_eq!(second.status, OrderStatus::Processing);
        assert_eq!(second.total_amount, Price::new(Decimal::from(135)));
    }

    #[tokio::test]
    async fn test_list_filters_by_buyer() {
        let store = LocalOrderStore::in_memory();
        store.create_order(&request(2, 1)).await.unwrap();
        store.create_order(&request(5, 1)).await.unwrap();
        store.create_order(&request(2, 2)).await.unwrap();

        let mine = store.list_orders(Some(BuyerId::new(2))).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|o| o.buyer_id == BuyerId::new(2)));

        let all = store.list_orders(None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");

        let store = LocalOrderStore::open(&path).await.unwrap();
        assert!(store.list_orders(None).await.unwrap().is_empty());
        store.create_order(&request(2, 1)).await.unwrap();
        store.create_order(&request(2, 2)).await.unwrap();
        drop(store);

        let reopened = LocalOrderStore::open(&path).await.unwrap();
        let orders = reopened.list_orders(None).await.unwrap();
        assert_eq!(orders.len(), 2);

        // Ids continue after the highest stored id
        let next = reopened.create_order(&request(2, 1)).await.unwrap();
        assert_eq!(next.id, OrderId::new(3));
    }

    #[tokio::test]
    async fn test_rejects_inconsistent_orders() {
        let store = LocalOrderStore::in_memory();

        let mut empty = request(2, 1);
        empty.lines.clear();
        let err = store.create_order(&empty).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));

        let mut wrong_total = request(2, 2);
        wrong_total.total_amount = Price::new(Decimal::from(1));
        let err = store.create_order(&wrong_total).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(msg) if msg.contains("90.00")));

        assert!(store.list_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_overflowing_total() {
        let store = LocalOrderStore::in_memory();
        let mut huge = request(2, 2);
        huge.lines[0].unit_price = Price::new(Decimal::MAX);

        let err = store.create_order(&huge).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(msg) if msg.contains("too large")));
    }

    #[tokio::test]
    async fn test_exhausted_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        let last = PlacedOrder::from_request(OrderId::new(i32::MAX), &request(2, 1), Utc::now());
        std::fs::write(&path, serde_json::to_vec(&vec![last]).unwrap()).unwrap();

        let store = LocalOrderStore::open(&path).await.unwrap();
        let err = store.create_order(&request(2, 1)).await.unwrap_err();

        assert!(matches!(err, BackendError::Rejected(msg) if msg.contains("exhausted")));
        assert_eq!(store.list_orders(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_log() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = LocalOrderStore::open(file.path()).await.unwrap();
        assert!(store.list_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = LocalOrderStore::open(&path).await.unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_record_order() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory does not exist, so every write fails
        let path = dir.path().join("missing").join("orders.json");

        let store = LocalOrderStore::open(&path).await.unwrap();
        let err = store.create_order(&request(2, 1)).await.unwrap_err();

        assert!(matches!(err, BackendError::Io(_)));
        assert!(store.list_orders(None).await.unwrap().is_empty());
    }
}
