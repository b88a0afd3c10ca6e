//! Recording backend for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use farmers_market_core::{BuyerId, OrderId};
use tokio::sync::Notify;

use super::{BackendError, OrderBackend};
use crate::order::{OrderRequest, PlacedOrder};

/// Backend that records requests and either accepts or fails them.
#[derive(Debug, Default)]
pub struct MockBackend {
    fail: bool,
    calls: AtomicUsize,
    submitted: Mutex<Vec<OrderRequest>>,
    gate: Option<Notify>,
    entered: Notify,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Backend whose `create_order` waits until [`Self::release`] is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Wait until a `create_order` call has started.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn create_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderBackend for MockBackend {
    async fn create_order(&self, request: &OrderRequest) -> Result<PlacedOrder, BackendError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.fail {
            return Err(BackendError::Status {
                status: 500,
                body: "backend unavailable".to_string(),
            });
        }

        self.submitted.lock().unwrap().push(request.clone());
        let id = OrderId::new(i32::try_from(n).unwrap());
        Ok(PlacedOrder::from_request(id, request, Utc::now()))
    }

    async fn list_orders(&self, _buyer: Option<BuyerId>) -> Result<Vec<PlacedOrder>, BackendError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
