//! Shared cart handle passed to every view.
//!
//! [`CartStore`] is cheaply cloneable via `Arc`. All clones see the same
//! [`Cart`]. A checkout holds an in-flight flag for its whole duration:
//! a second checkout, or any mutation, fails with
//! [`CartError::SubmissionInProgress`] until the first one resolves. Queries
//! keep working meanwhile.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use farmers_market_core::{Price, ProductId};
use tracing::{info, instrument, warn};

use crate::backend::OrderBackend;
use crate::cart::{Cart, CartLine};
use crate::error::{CartError, Result};
use crate::order::{Buyer, PlacedOrder};
use crate::product::ProductSnapshot;

/// Shared, cloneable cart handle.
#[derive(Clone, Default)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

#[derive(Default)]
struct CartStoreInner {
    cart: Mutex<Cart>,
    submitting: AtomicBool,
}

/// Clears the in-flight flag on drop, including on early return.
struct SubmissionGuard<'a>(&'a AtomicBool);

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("cart", &*self.lock())
            .field("submitting", &self.is_submitting())
            .finish()
    }
}

impl CartStore {
    /// Create a store holding an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store around an existing cart.
    #[must_use]
    pub fn with_cart(cart: Cart) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                cart: Mutex::new(cart),
                submitting: AtomicBool::new(false),
            }),
        }
    }

    // Poisoning is ignored; `Cart` methods validate before they write.
    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.inner.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // The flag is only set with the cart locked, so checking it under the
    // same lock orders every mutation before or after a checkout snapshot.
    fn lock_for_update(&self) -> Result<MutexGuard<'_, Cart>> {
        let cart = self.lock();
        if self.is_submitting() {
            return Err(CartError::SubmissionInProgress);
        }
        Ok(cart)
    }

    /// Returns `true` while a checkout is awaiting the backend.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.inner.submitting.load(Ordering::Acquire)
    }

    /// See [`Cart::add_line`].
    ///
    /// # Errors
    ///
    /// [`CartError::SubmissionInProgress`] during a checkout, otherwise as
    /// [`Cart::add_line`].
    pub fn add_line(&self, product: &ProductSnapshot, quantity: u32) -> Result<()> {
        self.lock_for_update()?.add_line(product, quantity)
    }

    /// See [`Cart::remove_line`].
    ///
    /// # Errors
    ///
    /// [`CartError::SubmissionInProgress`] during a checkout.
    pub fn remove_line(&self, product_id: ProductId) -> Result<bool> {
        Ok(self.lock_for_update()?.remove_line(product_id))
    }

    /// See [`Cart::set_quantity`].
    ///
    /// # Errors
    ///
    /// [`CartError::SubmissionInProgress`] during a checkout, otherwise as
    /// [`Cart::set_quantity`].
    pub fn set_quantity(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        self.lock_for_update()?.set_quantity(product_id, quantity)
    }

    /// See [`Cart::clear`].
    ///
    /// # Errors
    ///
    /// [`CartError::SubmissionInProgress`] during a checkout.
    pub fn clear(&self) -> Result<()> {
        self.lock_for_update()?.clear();
        Ok(())
    }

    #[must_use]
    pub fn total(&self) -> Price {
        self.lock().total()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lock().line_count()
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock().item_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().lines().to_vec()
    }

    /// Copy of the whole cart for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.lock().clone()
    }

    /// Check the cart out through `backend`.
    ///
    /// Behaves as [`Cart::submit_order`], with the lock released while the
    /// backend call is pending.
    ///
    /// # Errors
    ///
    /// - [`CartError::SubmissionInProgress`] if another checkout is pending
    /// - otherwise as [`Cart::submit_order`]
    #[instrument(skip_all)]
    pub async fn submit_order(
        &self,
        buyer: Option<&Buyer>,
        backend: &dyn OrderBackend,
    ) -> Result<PlacedOrder> {
        let (request, _guard) = {
            let cart = self.lock();
            if self
                .inner
                .submitting
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                warn!("Rejected overlapping order submission");
                return Err(CartError::SubmissionInProgress);
            }
            let guard = SubmissionGuard(&self.inner.submitting);
            (cart.checkout_request(buyer)?, guard)
        };

        match backend.create_order(&request).await {
            Ok(order) => {
                // Mutations were refused while in flight, so the cart still
                // holds exactly what was submitted.
                self.lock().clear();
                info!(order_id = %order.id, buyer_id = %request.buyer_id, "Order placed");
                Ok(order)
            }
            Err(e) => {
                warn!(error = %e, buyer_id = %request.buyer_id, "Order submission failed");
                Err(e.into())
            }
        }
    }
}
