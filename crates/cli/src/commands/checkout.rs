//! Cart file summary and checkout commands.
//!
//! # Cart File Format
//!
//! ```json
//! [
//!   {
//!     "product": {
//!       "id": 1,
//!       "stockItem": "Organic Tomatoes",
//!       "pricePerUnit": 85.0,
//!       "category": { "id": 1, "categoryName": "Vegetables" },
//!       "farmerId": 1
//!     },
//!     "quantity": 2
//!   }
//! ]
//! ```

use std::fmt::Write as _;
use std::path::Path;

use farmers_market_cart::{Buyer, Cart, CartError, MarketConfig, PlacedOrder, ProductSnapshot};
use farmers_market_core::BuyerId;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while loading a cart file.
#[derive(Debug, Error)]
pub enum CartFileError {
    /// The file could not be read.
    #[error("Cannot read cart file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid cart document.
    #[error("Invalid cart file: {0}")]
    Parse(#[from] serde_json::Error),

    /// An entry was rejected by the cart.
    #[error("Invalid cart entry {index}: {source}")]
    Entry {
        /// Zero-based entry position.
        index: usize,
        /// Why the cart rejected it.
        source: CartError,
    },
}

/// One entry of a cart file.
#[derive(Debug, Deserialize)]
struct CartEntry {
    product: ProductSnapshot,
    quantity: u32,
}

/// Build a cart from the entries in `path`.
///
/// Entries for the same product accumulate onto one line.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or an entry has a
/// zero quantity.
pub async fn load_cart(path: &Path) -> Result<Cart, CartFileError> {
    let content = tokio::fs::read_to_string(path).await?;
    let entries: Vec<CartEntry> = serde_json::from_str(&content)?;

    let mut cart = Cart::new();
    for (index, entry) in entries.iter().enumerate() {
        cart.add_line(&entry.product, entry.quantity)
            .map_err(|source| CartFileError::Entry { index, source })?;
    }
    Ok(cart)
}

/// Render the cart as a plain-text table.
#[must_use]
pub fn render_cart(cart: &Cart) -> String {
    let mut out = String::new();
    for line in cart.lines() {
        let _ = writeln!(
            out,
            "{:>5}  {:<28} {:<12} {:>4} x {:>9} = {:>10}",
            line.product_id.to_string(),
            line.display_name,
            line.category_label,
            line.quantity,
            line.unit_price.to_string(),
            line.subtotal().to_string(),
        );
    }
    let _ = writeln!(
        out,
        "{} line(s), {} item(s), total {}",
        cart.line_count(),
        cart.item_count(),
        cart.total()
    );
    out
}

/// Render a placed order confirmation.
#[must_use]
pub fn render_order(order: &PlacedOrder) -> String {
    format!(
        "Order #{} placed for user {} on {}: {} item(s), total {} [{}]",
        order.id,
        order.buyer_id,
        order.order_date.format("%Y-%m-%d %H:%M"),
        order.item_count(),
        order.total_amount,
        order.status,
    )
}

/// Print a cart file's lines and total.
///
/// # Errors
///
/// Returns an error if the cart file is invalid.
pub async fn summarize(path: &Path) -> Result<(), CartFileError> {
    let cart = load_cart(path).await?;

    #[allow(clippy::print_stdout)]
    {
        print!("{}", render_cart(&cart));
    }
    Ok(())
}

/// Submit a cart file as an order through the configured backend.
///
/// # Errors
///
/// Returns an error if the cart file is invalid, the backend cannot be
/// built, or the submission fails.
pub async fn submit(
    config: &MarketConfig,
    path: &Path,
    buyer_id: BuyerId,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut cart = load_cart(path).await?;
    let backend = config.build_backend().await?;
    let buyer = Buyer::new(buyer_id, name);

    info!(
        backend = backend.name(),
        lines = cart.line_count(),
        total = %cart.total(),
        "Submitting order"
    );
    let order = cart.submit_order(Some(&buyer), backend.as_ref()).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", render_order(&order));
    }
    Ok(())
}
