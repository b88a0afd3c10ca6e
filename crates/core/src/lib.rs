//! Farmers Market Core - Shared types library.
//!
//! This crate provides common types used across all Farmers Market components:
//! - `cart` - Cart aggregator and order submission backends
//! - `cli` - Command-line tools for checking out carts and listing orders
//!
//! # Architecture
//!
//! Plain value types with serde support. No I/O and no async runtime, so the
//! cart, the CLI and the test harness can all share them.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
