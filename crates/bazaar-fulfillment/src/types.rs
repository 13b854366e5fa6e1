//! Wire types for the fulfillment provider's REST API.
//!
//! ## Observed shape
//!
//! ### Listing
//! `GET /products` returns `{"data": [...], "meta": {...}}`. `meta` carries
//! `page` (1-based), `per_page`, `total`, and `total_pages`; some accounts
//! omit it entirely on single-page results, so it is optional.
//!
//! ### Identifiers
//! Product and variant ids arrive as JSON numbers on older accounts and as
//! strings on newer ones. Both are accepted and carried as strings.
//!
//! ### Prices
//! Usually decimal strings (`"19.99"`), occasionally bare numbers. Both are
//! accepted; numbers keep their literal text so no float rounding sneaks in.
//!
//! ### Images
//! Either plain URL strings or objects with `src` and an optional `position`.
//!
//! ### Errors
//! Error bodies come in three flavors: `{"error": {"message": "..."}}`,
//! `{"error": "..."}`, and `{"message": "..."}`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A page of results from the listing endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Top-level response from `GET /products`.
#[derive(Debug, Deserialize)]
pub struct ListEnvelope {
    pub data: Vec<WireItem>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

/// Top-level response from `GET /products/{id}`.
#[derive(Debug, Deserialize)]
pub struct ItemEnvelope {
    pub data: WireItem,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Identifier sent either as a JSON number or a string.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum WireId {
    Num(i64),
    Str(String),
}

impl std::fmt::Display for WireId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireId::Num(n) => write!(f, "{n}"),
            WireId::Str(s) => f.write_str(s),
        }
    }
}

/// Price sent either as a decimal string or a bare JSON number.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WirePrice {
    Str(String),
    Num(serde_json::Number),
}

impl WirePrice {
    /// The literal text of the price, as sent.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            WirePrice::Str(s) => s.trim().to_owned(),
            WirePrice::Num(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireImage {
    Url(String),
    Object {
        src: String,
        #[serde(default)]
        position: Option<i32>,
    },
}

impl WireImage {
    #[must_use]
    pub fn src(&self) -> &str {
        match self {
            WireImage::Url(src) | WireImage::Object { src, .. } => src,
        }
    }

    #[must_use]
    pub fn position(&self) -> Option<i32> {
        match self {
            WireImage::Url(_) => None,
            WireImage::Object { position, .. } => *position,
        }
    }
}

/// A single product as sent by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct WireItem {
    pub id: WireId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: WirePrice,
    /// Defaults to USD in normalization when absent.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, alias = "inventory")]
    pub inventory_count: Option<i64>,
    #[serde(default)]
    pub images: Vec<WireImage>,
    #[serde(default)]
    pub variants: Vec<WireVariant>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireVariant {
    pub id: WireId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    /// Falls back to the parent item's price when absent.
    #[serde(default)]
    pub price: Option<WirePrice>,
    #[serde(default, alias = "inventory")]
    pub inventory_count: Option<i64>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Pulls a human-readable message out of an error response body, if there is one.
pub(crate) fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error");

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(serde_json::Value::as_str)
        .or_else(|| error.and_then(serde_json::Value::as_str))
        .or_else(|| value.get("message").and_then(serde_json::Value::as_str))?;

    let message = message.trim();
    (!message.is_empty()).then(|| message.to_owned())
}
