//! Farmers Market Cart - cart aggregation and order submission.
//!
//! # Architecture
//!
//! - [`Cart`] is the authoritative in-memory cart: one line per product,
//!   insertion order preserved, total recomputed after every mutation.
//! - [`CartStore`] is the shared handle views hold. It guards against
//!   overlapping checkouts.
//! - [`OrderBackend`] is the order-submission collaborator. The REST client
//!   ([`HttpOrderBackend`]) and the local fallback ([`LocalOrderStore`]) are
//!   interchangeable and picked by [`MarketConfig`].
//!
//! # Example
//!
//! ```rust,ignore
//! use farmers_market_cart::{Buyer, CartStore, MarketConfig};
//!
//! let config = MarketConfig::from_env()?;
//! let backend = config.build_backend().await?;
//!
//! let cart = CartStore::new();
//! cart.add_line(&product, 2)?;
//!
//! let order = cart.submit_order(Some(&buyer), backend.as_ref()).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cart;
pub mod config;
pub mod error;
pub mod order;
pub mod product;
pub mod store;

pub use backend::{BackendError, HttpOrderBackend, LocalOrderStore, OrderBackend};
pub use cart::{Cart, CartLine};
pub use config::{BackendKind, ConfigError, MarketConfig};
pub use error::CartError;
pub use order::{Buyer, OrderLineRequest, OrderRequest, PlacedOrder};
pub use product::{FarmerRef, ProductSnapshot};
pub use store::CartStore;
