//! Order payloads exchanged with the order backend.
//!
//! Wire names follow the marketplace REST API (`userId`, `totalAmount`,
//! `items`, `pricePerUnit`).

use chrono::{DateTime, Utc};
use farmers_market_core::{BuyerId, FarmerId, OrderId, OrderStatus, Price, ProductId};
use serde::{Deserialize, Serialize};

/// Farmer name recorded when the product snapshot carried no farmer.
pub const UNKNOWN_FARMER: &str = "Unknown Farmer";

/// The signed-in user placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    pub id: BuyerId,
    pub display_name: String,
}

impl Buyer {
    #[must_use]
    pub fn new(id: BuyerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

/// One line of an order, captured from a cart line at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    #[serde(rename = "pricePerUnit")]
    pub unit_price: Price,
    pub category: String,
    pub farmer_id: Option<FarmerId>,
    pub farmer_name: String,
}

impl OrderLineRequest {
    /// `unit_price × quantity` for this line.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// An order ready to hand to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(rename = "userId")]
    pub buyer_id: BuyerId,
    pub total_amount: Price,
    #[serde(rename = "items")]
    pub lines: Vec<OrderLineRequest>,
}

/// An order accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub id: OrderId,
    #[serde(rename = "userId")]
    pub buyer_id: BuyerId,
    pub order_date: DateTime<Utc>,
    #[serde(default)]
    pub status: OrderStatus,
    pub total_amount: Price,
    #[serde(rename = "items", default)]
    pub lines: Vec<OrderLineRequest>,
}

impl PlacedOrder {
    /// Build the record for a freshly accepted request.
    #[must_use]
    pub fn from_request(id: OrderId, request: &OrderRequest, order_date: DateTime<Utc>) -> Self {
        Self {
            id,
            buyer_id: request.buyer_id,
            order_date,
            status: OrderStatus::Processing,
            total_amount: request.total_amount,
            lines: request.lines.clone(),
        }
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}
