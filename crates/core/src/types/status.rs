//! Status enums for marketplace entities.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// Serialized as the capitalized word the marketplace API uses
/// (`"Processing"`, `"Shipped"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Accepted and awaiting fulfillment.
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Returns `true` once the order can no longer change.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "Processing"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"Processing\"");
        let parsed: OrderStatus = serde_json::from_str("\"Delivered\"").unwrap();
        assert_eq!(parsed, OrderStatus::Delivered);
    }

    #[test]
    fn test_status_from_str_is_case_insensitive() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert_eq!("CANCELED".parse::<OrderStatus>(), Ok(OrderStatus::Cancelled));
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_final_statuses() {
        assert!(!OrderStatus::Processing.is_final());
        assert!(!OrderStatus::Shipped.is_final());
        assert!(OrderStatus::Delivered.is_final());
        assert!(OrderStatus::Cancelled.is_final());
    }
}
