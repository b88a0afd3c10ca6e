//! The in-memory cart aggregator.
//!
//! A [`Cart`] holds at most one [`CartLine`] per product, in the order the
//! products were first added. The cached total is recomputed after every
//! mutation and never changed any other way.

use farmers_market_core::{FarmerId, Price, ProductId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::backend::OrderBackend;
use crate::error::{CartError, Result};
use crate::order::{Buyer, OrderLineRequest, OrderRequest, PlacedOrder, UNKNOWN_FARMER};
use crate::product::{FarmerRef, ProductSnapshot};

/// Category label used when the product snapshot has none.
pub const DEFAULT_CATEGORY: &str = "General";

/// One product entry in the cart.
///
/// `quantity` is always at least 1 and `unit_price` is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub display_name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub category_label: String,
    pub image_ref: Option<String>,
    pub farmer_id: Option<FarmerId>,
    pub farmer: Option<FarmerRef>,
}

impl CartLine {
    fn from_snapshot(product: &ProductSnapshot, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            display_name: product.name.clone(),
            unit_price: product.unit_price,
            quantity,
            category_label: product
                .category_name()
                .unwrap_or(DEFAULT_CATEGORY)
                .to_string(),
            image_ref: product.image.clone(),
            farmer_id: product.seller_id(),
            farmer: product.farmer.clone(),
        }
    }

    /// `unit_price × quantity` for this line.
    ///
    /// Every line's subtotal was checked when the line was last changed,
    /// so this cannot overflow.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.unit_price.times(self.quantity)
    }

    fn to_order_line(&self) -> OrderLineRequest {
        OrderLineRequest {
            product_id: self.product_id,
            product_name: self.display_name.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            category: self.category_label.clone(),
            farmer_id: self.farmer_id,
            farmer_name: self
                .farmer
                .as_ref()
                .map_or_else(|| UNKNOWN_FARMER.to_string(), FarmerRef::full_name),
        }
    }
}

/// The shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    total: Price,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of `product`.
    ///
    /// Increments the existing line for the product, or appends a new line.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidQuantity`] if `quantity` is zero or the line's
    ///   quantity would overflow
    /// - [`CartError::InvalidPrice`] if the unit price is negative
    /// - [`CartError::TotalOverflow`] if the cart total would overflow
    ///
    /// The cart is unchanged on error.
    pub fn add_line(&mut self, product: &ProductSnapshot, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        if product.unit_price.is_negative() {
            return Err(CartError::InvalidPrice(product.unit_price));
        }

        let (unit_price, new_quantity) = match self.line(product.id) {
            Some(line) => (
                line.unit_price,
                line.quantity
                    .checked_add(quantity)
                    .ok_or(CartError::InvalidQuantity(quantity))?,
            ),
            None => (product.unit_price, quantity),
        };
        let total = self.total_with(product.id, unit_price, new_quantity)?;

        if let Some(line) = self.line_mut(product.id) {
            line.quantity = new_quantity;
            debug!(product_id = %product.id, quantity = new_quantity, "Cart line incremented");
        } else {
            self.lines.push(CartLine::from_snapshot(product, quantity));
            debug!(product_id = %product.id, quantity, "Cart line added");
        }

        self.total = total;
        Ok(())
    }

    /// Remove the line for `product_id`.
    ///
    /// Returns `false` if the product was not in the cart.
    pub fn remove_line(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        let removed = self.lines.len() != before;

        if removed {
            debug!(%product_id, "Cart line removed");
            self.recompute_total();
        }
        removed
    }

    /// Overwrite the quantity of the line for `product_id`.
    ///
    /// A quantity of zero removes the line, whether or not it exists.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotFound`] if `quantity` is positive and the product
    ///   is not in the cart
    /// - [`CartError::TotalOverflow`] if the cart total would overflow
    ///
    /// The cart is unchanged on error.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            self.remove_line(product_id);
            return Ok(());
        }

        let unit_price = self
            .line(product_id)
            .ok_or(CartError::NotFound(product_id))?
            .unit_price;
        let total = self.total_with(product_id, unit_price, quantity)?;

        if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
            debug!(%product_id, quantity, "Cart line quantity set");
        }

        self.total = total;
        Ok(())
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.total = Price::ZERO;
    }

    /// Sum of `unit_price × quantity` over all lines.
    #[must_use]
    pub const fn total(&self) -> Price {
        self.total
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Snapshot the cart as an order for `buyer`.
    #[must_use]
    pub fn order_request(&self, buyer: &Buyer) -> OrderRequest {
        OrderRequest {
            buyer_id: buyer.id,
            total_amount: self.total,
            lines: self.lines.iter().map(CartLine::to_order_line).collect(),
        }
    }

    /// Check the cart out through `backend`.
    ///
    /// On success the cart is cleared and the backend's order returned. On
    /// failure the cart is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`CartError::EmptyCart`] if there are no lines (the backend is not called)
    /// - [`CartError::NotAuthenticated`] if `buyer` is `None`
    /// - [`CartError::OrderSubmissionFailed`] if the backend fails
    #[instrument(skip_all, fields(lines = self.lines.len(), total = %self.total))]
    pub async fn submit_order(
        &mut self,
        buyer: Option<&Buyer>,
        backend: &dyn OrderBackend,
    ) -> Result<PlacedOrder> {
        let request = self.checkout_request(buyer)?;

        match backend.create_order(&request).await {
            Ok(order) => {
                info!(order_id = %order.id, buyer_id = %request.buyer_id, "Order placed");
                self.clear();
                Ok(order)
            }
            Err(e) => {
                warn!(error = %e, buyer_id = %request.buyer_id, "Order submission failed");
                Err(e.into())
            }
        }
    }

    /// Validate checkout preconditions and build the request.
    pub(crate) fn checkout_request(&self, buyer: Option<&Buyer>) -> Result<OrderRequest> {
        if self.is_empty() {
            return Err(CartError::EmptyCart);
        }
        let buyer = buyer.ok_or(CartError::NotAuthenticated)?;
        Ok(self.order_request(buyer))
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }

    /// The total the cart would have with the line for `product_id` at
    /// `quantity` units of `unit_price`, appended if absent.
    fn total_with(
        &self,
        product_id: ProductId,
        unit_price: Price,
        quantity: u32,
    ) -> Result<Price> {
        let changed = unit_price
            .checked_times(quantity)
            .ok_or(CartError::TotalOverflow)?;
        let present = self.line(product_id).is_some();

        let subtotals = self
            .lines
            .iter()
            .map(|line| {
                if line.product_id == product_id {
                    changed
                } else {
                    line.subtotal()
                }
            })
            .chain((!present).then_some(changed));
        Price::checked_sum(subtotals).ok_or(CartError::TotalOverflow)
    }

    // Subtotals are non-negative and their full sum fits, so the sum of any
    // subset fits too.
    fn recompute_total(&mut self) {
        self.total = self.lines.iter().map(CartLine::subtotal).sum();
    }
}
