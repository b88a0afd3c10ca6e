//! Order listing command.

use farmers_market_cart::{MarketConfig, PlacedOrder};
use farmers_market_core::BuyerId;
use tracing::info;

/// One-line summary of an order. Orders still in progress are marked `*`.
#[must_use]
pub fn render_order_row(order: &PlacedOrder) -> String {
    let marker = if order.status.is_final() { " " } else { "*" };
    format!(
        "{marker}#{:<5} user {:<5} {}  {:<10} {:>4} item(s)  {:>10}",
        order.id.to_string(),
        order.buyer_id.to_string(),
        order.order_date.format("%Y-%m-%d"),
        order.status.to_string(),
        order.item_count(),
        order.total_amount.to_string(),
    )
}

/// List orders through the configured backend, newest first.
///
/// # Errors
///
/// Returns an error if the backend cannot be built or the listing fails.
pub async fn list(
    config: &MarketConfig,
    buyer: Option<BuyerId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = config.build_backend().await?;
    let mut orders = backend.list_orders(buyer).await?;
    orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));

    info!(backend = backend.name(), count = orders.len(), "Orders fetched");

    #[allow(clippy::print_stdout)]
    {
        if orders.is_empty() {
            println!("No orders found");
        }
        for order in &orders {
            println!("{}", render_order_row(order));
        }
    }
    Ok(())
}
