//! Normalization from provider wire types to [`bazaar_core::RemoteCatalogItem`].

use std::str::FromStr;

use bazaar_core::{RemoteCatalogItem, RemoteVariant};
use rust_decimal::Decimal;

use crate::error::ApiError;
use crate::types::{WireImage, WireItem, WirePrice, WireVariant};

const DEFAULT_CURRENCY: &str = "USD";

/// Normalizes a raw [`WireItem`] into a [`RemoteCatalogItem`].
///
/// # Errors
///
/// Returns [`ApiError::Normalization`] if the item id or title is blank, or if
/// the item or any variant carries a price that is not a non-negative decimal.
pub fn normalize_item(item: WireItem) -> Result<RemoteCatalogItem, ApiError> {
    let external_id = item.id.to_string().trim().to_owned();
    if external_id.is_empty() {
        return Err(ApiError::Normalization {
            external_id,
            reason: "item has an empty id".into(),
        });
    }

    let title = item.title.trim().to_owned();
    if title.is_empty() {
        return Err(ApiError::Normalization {
            external_id,
            reason: "item has an empty title".into(),
        });
    }

    let price = parse_price(&item.price, &external_id, "item")?;

    let variants = item
        .variants
        .into_iter()
        .map(|v| normalize_variant(v, price, &external_id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RemoteCatalogItem {
        external_id,
        title,
        description: non_blank(item.description),
        sku: non_blank(item.sku),
        price,
        currency_code: non_blank(item.currency)
            .map_or_else(|| DEFAULT_CURRENCY.to_owned(), |c| c.to_uppercase()),
        inventory_count: clamp_inventory(item.inventory_count),
        images: order_images(item.images),
        variants,
        tags: clean_labels(item.tags),
        categories: clean_labels(item.categories),
        vendor: non_blank(item.vendor),
        updated_at: item.updated_at,
    })
}

fn normalize_variant(
    variant: WireVariant,
    item_price: Decimal,
    external_id: &str,
) -> Result<RemoteVariant, ApiError> {
    let variant_id = variant.id.to_string();
    let price = match &variant.price {
        Some(p) => parse_price(p, external_id, &format!("variant {variant_id}"))?,
        None => item_price,
    };

    Ok(RemoteVariant {
        title: non_blank(variant.title).unwrap_or_else(|| "Default".to_owned()),
        external_id: variant_id,
        sku: non_blank(variant.sku),
        price,
        inventory_count: clamp_inventory(variant.inventory_count),
        options: variant.options,
    })
}

fn parse_price(raw: &WirePrice, external_id: &str, what: &str) -> Result<Decimal, ApiError> {
    let text = raw.as_text();
    let price = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ApiError::Normalization {
            external_id: external_id.to_owned(),
            reason: format!("{what} has unparseable price \"{text}\""),
        })?;
    if price.is_sign_negative() {
        return Err(ApiError::Normalization {
            external_id: external_id.to_owned(),
            reason: format!("{what} has negative price {price}"),
        });
    }
    Ok(price)
}

/// Orders images by explicit position when the provider sends one; otherwise
/// keeps the order they arrived in. Blank URLs are dropped.
fn order_images(images: Vec<WireImage>) -> Vec<String> {
    let mut indexed: Vec<(usize, WireImage)> = images
        .into_iter()
        .filter(|img| !img.src().trim().is_empty())
        .enumerate()
        .collect();

    if indexed.iter().any(|(_, img)| img.position().is_some()) {
        // Unpositioned images sort after positioned ones, keeping arrival order.
        indexed.sort_by_key(|(idx, img)| (img.position().unwrap_or(i32::MAX), *idx));
    }

    indexed
        .into_iter()
        .map(|(_, img)| img.src().trim().to_owned())
        .collect()
}

fn clean_labels(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim();
        if !label.is_empty() && !out.iter().any(|l| l == label) {
            out.push(label.to_owned());
        }
    }
    out
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Negative stock is reported by some warehouses for backorders; treat it as none.
fn clamp_inventory(count: Option<i64>) -> i32 {
    count.map_or(0, |c| i32::try_from(c.max(0)).unwrap_or(i32::MAX))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
