//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use hoi_core::{Gender, ProductId, ProductStatus};

/// Image used for line items when a product has no media at all.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x600?text=HOI";

/// Stock held for one size label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeStock {
    pub label: String,
    #[serde(default)]
    pub stock: i32,
}

/// Product pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrice {
    pub mrp: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
    #[serde(default)]
    pub sale: Option<Decimal>,
}

impl ProductPrice {
    /// Price the customer pays per unit. Falls back to MRP when no positive
    /// sale price is set.
    #[must_use]
    pub fn effective_sale(&self) -> Decimal {
        self.sale
            .filter(|s| s.is_sign_positive() && !s.is_zero())
            .unwrap_or(self.mrp)
    }
}

/// Fabric and fit attributes shown on the product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fabric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underwire: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strap_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub care_instructions: Option<String>,
}

/// Search engine metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Seo {
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
    pub schema_markup: String,
}

/// Everything about a product except its identity and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub name: String,
    pub slug: String,
    pub brand: Option<String>,
    pub gender: Gender,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub sku: Option<String>,
    pub tax_slab: Option<String>,
    pub main_image: String,
    pub gallery_images: Vec<String>,
    pub size_guide_url: String,
    pub video_url: String,
    pub colors: Vec<String>,
    pub sizes: Vec<SizeStock>,
    pub price: ProductPrice,
    pub total_stock: i32,
    pub status: ProductStatus,
    pub is_featured: bool,
    #[serde(flatten)]
    pub attributes: ProductAttributes,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub collections: Vec<String>,
    pub seo: Seo,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub details: ProductDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Image for order snapshots: main image, then first gallery image,
    /// then [`PLACEHOLDER_IMAGE`].
    #[must_use]
    pub fn display_image(&self) -> &str {
        let d = &self.details;
        [Some(d.main_image.as_str()), d.gallery_images.first().map(String::as_str)]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(PLACEHOLDER_IMAGE)
    }

    /// Return `quantity` units to stock.
    ///
    /// The flat counter always grows. The size entry grows too when the
    /// product tracks sizes and `size` names one of them.
    pub fn restock(&mut self, quantity: i32, size: Option<&str>) {
        let d = &mut self.details;
        d.total_stock = d.total_stock.saturating_add(quantity);

        if let Some(label) = size
            && let Some(entry) = d.sizes.iter_mut().find(|s| s.label == label)
        {
            entry.stock = entry.stock.saturating_add(quantity);
        }
    }
}
