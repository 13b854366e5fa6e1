//! Catalog items as they arrive from the fulfillment provider and as they are
//! mirrored locally.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ParseStatusError;

/// A product as published by the fulfillment provider, normalized for import.
///
/// Read-only from this system's point of view: the import pipeline mirrors it
/// but never writes it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCatalogItem {
    /// Provider-side identifier, unique across the provider's catalog.
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    /// ISO 4217 currency code (e.g., `"USD"`).
    pub currency_code: String,
    pub inventory_count: i32,
    /// Image URLs in display order. Index in this list becomes the image position.
    pub images: Vec<String>,
    pub variants: Vec<RemoteVariant>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub vendor: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteCatalogItem {
    #[must_use]
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    #[must_use]
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Sum of variant inventory, or the item-level count when there are no variants.
    #[must_use]
    pub fn total_inventory(&self) -> i32 {
        if self.variants.is_empty() {
            self.inventory_count
        } else {
            self.variants
                .iter()
                .fold(0i32, |acc, v| acc.saturating_add(v.inventory_count))
        }
    }
}

/// A purchasable variant of a [`RemoteCatalogItem`] (size, color, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteVariant {
    pub external_id: String,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub inventory_count: i32,
    /// Option name to value, e.g. `{"size": "M", "color": "navy"}`.
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Imported,
    Failed,
}

impl ImportStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Imported => "imported",
            ImportStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ImportStatus::Pending),
            "imported" => Ok(ImportStatus::Imported),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(ParseStatusError {
                kind: "import",
                value: other.to_string(),
            }),
        }
    }
}

/// Local mirror of a [`RemoteCatalogItem`], one row per `external_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCatalogItem {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Decimal,
    pub currency_code: String,
    pub inventory_count: i32,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub vendor: Option<String>,
    pub import_status: ImportStatus,
    /// Set once the item has been turned into a marketplace product.
    pub local_product_id: Option<i64>,
    pub imported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCatalogItem {
    #[must_use]
    pub fn is_imported(&self) -> bool {
        self.import_status == ImportStatus::Imported
    }
}

/// Local mirror of a [`RemoteVariant`], keyed by `(stored_item_id, external_variant_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVariant {
    pub id: i64,
    pub stored_item_id: i64,
    pub external_variant_id: String,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub inventory_count: i32,
    pub options: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
}
