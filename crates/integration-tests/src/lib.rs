//! Integration test harness for the Farmers Market order backends.
//!
//! [`FakeOrderApi`] serves the marketplace order endpoints from an in-memory
//! list on `127.0.0.1:0`, so the HTTP backend and the cart can be driven end
//! to end without the real marketplace.
//!
//! # Routes
//!
//! - `POST {prefix}/api/orders` - record an order, answer with the placed order
//! - `GET {prefix}/api/orders[?userId=N]` - list recorded orders

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use farmers_market_cart::config::ApiConfig;
use farmers_market_cart::{OrderRequest, PlacedOrder};
use farmers_market_core::{BuyerId, OrderId};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use url::Url;

/// Path prefix the fake API is mounted under, like a servlet context.
pub const CONTEXT_PATH: &str = "/FarmersMarketplace";

#[derive(Default)]
struct FakeState {
    orders: Mutex<Vec<PlacedOrder>>,
    raw_requests: Mutex<Vec<Value>>,
    fail_with: Mutex<Option<StatusCode>>,
    delay_ms: AtomicU64,
    required_token: Mutex<Option<String>>,
}

/// A running fake order API.
pub struct FakeOrderApi {
    addr: SocketAddr,
    state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(rename = "userId")]
    user_id: Option<i32>,
}

impl FakeOrderApi {
    /// Start the fake API on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());

        let app = Router::new()
            .route(
                &format!("{CONTEXT_PATH}/api/orders"),
                post(create_order).get(list_orders),
            )
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL including the context path.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}{CONTEXT_PATH}", self.addr)).unwrap()
    }

    /// API settings pointing at this server.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url(),
            token: None,
            timeout: Duration::from_secs(5),
        }
    }

    /// Answer every request with `status` until cleared.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        *self.state.fail_with.lock().unwrap() = status;
    }

    /// Delay every response.
    pub fn delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.state.delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Reject requests that do not carry `Authorization: Bearer {token}`.
    pub fn require_token(&self, token: &str) {
        *self.state.required_token.lock().unwrap() = Some(token.to_string());
    }

    /// Orders recorded so far.
    #[must_use]
    pub fn orders(&self) -> Vec<PlacedOrder> {
        self.state.orders.lock().unwrap().clone()
    }

    /// Raw JSON bodies of every accepted `POST`.
    #[must_use]
    pub fn raw_requests(&self) -> Vec<Value> {
        self.state.raw_requests.lock().unwrap().clone()
    }

    /// Seed an existing order.
    pub fn seed(&self, order: PlacedOrder) {
        self.state.orders.lock().unwrap().push(order);
    }
}

impl Drop for FakeOrderApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}{CONTEXT_PATH}")).unwrap()
}

/// API settings with a bearer token.
#[must_use]
pub fn with_token(mut config: ApiConfig, token: &str) -> ApiConfig {
    config.token = Some(SecretString::from(token.to_string()));
    config
}

async fn gate(state: &FakeState, headers: &HeaderMap) -> Option<Response> {
    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let required = state.required_token.lock().unwrap().clone();
    if let Some(token) = required {
        let expected = format!("Bearer {token}");
        let sent = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if sent != Some(expected.as_str()) {
            return Some((StatusCode::UNAUTHORIZED, "missing or bad token").into_response());
        }
    }

    let fail_with = *state.fail_with.lock().unwrap();
    fail_with.map(|status| (status, "simulated failure").into_response())
}

async fn create_order(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(response) = gate(&state, &headers).await {
        return response;
    }

    let request: OrderRequest = match serde_json::from_value(body.clone()) {
        Ok(request) => request,
        Err(e) => return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    };

    let order = {
        let mut orders = state.orders.lock().unwrap();
        let next_id = orders.iter().map(|o| o.id.as_i32()).max().unwrap_or(0) + 1;
        let order = PlacedOrder::from_request(OrderId::new(next_id), &request, Utc::now());
        orders.push(order.clone());
        order
    };
    state.raw_requests.lock().unwrap().push(body);

    (StatusCode::CREATED, Json(order)).into_response()
}

async fn list_orders(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    if let Some(response) = gate(&state, &headers).await {
        return response;
    }

    let orders: Vec<PlacedOrder> = state
        .orders
        .lock()
        .unwrap()
        .iter()
        .filter(|o| params.user_id.is_none_or(|id| o.buyer_id == BuyerId::new(id)))
        .cloned()
        .collect();
    Json(orders).into_response()
}
