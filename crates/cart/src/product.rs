//! Product snapshots handed to the cart by the catalog.

use farmers_market_core::{FarmerId, Price, ProductId};
use serde::{Deserialize, Serialize};

/// The farmer selling a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerRef {
    #[serde(rename = "farmerId")]
    pub id: FarmerId,
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
}

impl FarmerRef {
    /// "First Last" display name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A product category as the catalog nests it (`{ "id": 1, "categoryName": ... }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(rename = "categoryName")]
    pub name: String,
}

/// Catalog data for a product at the moment it is added to the cart.
///
/// Field names follow the marketplace catalog payload (`stockItem`,
/// `pricePerUnit`, `imagePath`). Catalog listings carry only a top-level
/// `farmerId`; the full `farmer` object is present when the product was
/// loaded with its seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    #[serde(rename = "stockItem")]
    pub name: String,
    #[serde(rename = "pricePerUnit")]
    pub unit_price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    #[serde(default, rename = "imagePath", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer_id: Option<FarmerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer: Option<FarmerRef>,
}

impl ProductSnapshot {
    /// Create a snapshot with just the fields the cart needs.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, unit_price: Price) -> Self {
        Self {
            id,
            name: name.into(),
            unit_price,
            category: None,
            image: None,
            farmer_id: None,
            farmer: None,
        }
    }

    /// Set the category by name.
    #[must_use]
    pub fn with_category(mut self, name: impl Into<String>) -> Self {
        self.category = Some(CategoryRef {
            id: None,
            name: name.into(),
        });
        self
    }

    /// Set the image reference.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the selling farmer.
    #[must_use]
    pub fn with_farmer(mut self, farmer: FarmerRef) -> Self {
        self.farmer_id = Some(farmer.id);
        self.farmer = Some(farmer);
        self
    }

    /// The category name, if the catalog gave one.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|category| category.name.as_str())
    }

    /// The selling farmer's ID, from the `farmer` object when present,
    /// otherwise from the top-level `farmerId`.
    #[must_use]
    pub fn seller_id(&self) -> Option<FarmerId> {
        self.farmer.as_ref().map(|farmer| farmer.id).or(self.farmer_id)
    }
}
