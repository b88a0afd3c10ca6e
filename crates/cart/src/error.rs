//! Cart error type.

use farmers_market_core::{Price, ProductId};
use thiserror::Error;

use crate::backend::BackendError;

/// Errors returned by cart mutations and checkout.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity was zero, or would overflow the line.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The product's unit price is negative.
    #[error("Invalid unit price: {0}")]
    InvalidPrice(Price),

    /// The cart total would not fit in a decimal amount.
    #[error("Cart total is too large")]
    TotalOverflow,

    /// No line exists for the product.
    #[error("Product {0} is not in the cart")]
    NotFound(ProductId),

    /// Checkout was attempted with no lines.
    #[error("Cannot create order: cart is empty")]
    EmptyCart,

    /// Checkout was attempted without a signed-in buyer.
    #[error("Cannot create order: user not logged in")]
    NotAuthenticated,

    /// Another checkout on the same cart has not resolved yet.
    #[error("An order submission is already in progress")]
    SubmissionInProgress,

    /// The order backend rejected or failed the submission.
    #[error("Order submission failed: {0}")]
    OrderSubmissionFailed(#[from] BackendError),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
