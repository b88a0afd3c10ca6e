//! Command implementations.

pub mod checkout;
pub mod orders;
