//! Query filters for the fulfillment provider's product listing.

use chrono::{DateTime, SecondsFormat, Utc};

/// Default page size requested when the caller does not set one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Filters for `GET /products`. Unset and blank fields are left off the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilters {
    /// 1-based page number.
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub sku: Option<String>,
    pub in_stock: Option<bool>,
    pub updated_since: Option<DateTime<Utc>>,
}

impl CatalogFilters {
    /// Returns a copy pointing at `page`.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Serializes the non-empty fields as query pairs, in a fixed order.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }

        let text_fields = [
            ("search", &self.search),
            ("category", &self.category),
            ("tag", &self.tag),
            ("sku", &self.sku),
        ];
        for (name, value) in text_fields {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                pairs.push((name, v.to_owned()));
            }
        }

        if let Some(in_stock) = self.in_stock {
            pairs.push(("in_stock", in_stock.to_string()));
        }
        if let Some(since) = self.updated_since {
            pairs.push((
                "updated_since",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        pairs
    }
}
