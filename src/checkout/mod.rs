//! Checkout reconciliation: collect and validate requested items, group and
//! price them per seller, deduct stock and materialize orders.

pub mod collect;
pub mod materialize;
pub mod pricing;
pub mod stock;

pub use collect::{ItemCollection, collect_items};
pub use materialize::CreatedOrder;
pub use pricing::{CheckoutTotals, PricedLine, SellerGroup, group_by_seller, round2};

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{ProductEntity, ProductVariantEntity};
use crate::schema::{product_variants, products};

pub const PRODUCT_STATUS_ACTIVE: &str = "active";
pub const PRODUCT_STATUS_ARCHIVED: &str = "archived";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutSource {
    Cart,
    BuyNow,
}

/// One requested line before validation, resolved from either a cart item
/// or an explicit buy-now entry.
#[derive(Debug, Clone)]
pub struct RequestedLine {
    pub cart_item_id: Option<i32>,
    pub product_id: i32,
    pub variant_key: Option<String>,
    pub quantity: i32,
}

/// A line that passed existence, ownership and stock validation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PayableItem {
    pub cart_item_id: Option<i32>,
    pub product_id: i32,
    pub seller_id: i32,
    pub title: String,
    pub variant_key: Option<String>,
    pub unit_price: f64,
    pub quantity: i32,
    pub available_stock: i32,
}

/// A rejected line, reported item by item with the stock that remains.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnavailableItem {
    pub cart_item_id: Option<i32>,
    pub product_id: Option<i32>,
    pub variant_key: Option<String>,
    pub requested_quantity: i32,
    pub available_stock: i32,
    pub reason: String,
}

/// A sellable product together with its variant combinations.
#[derive(Debug, Clone)]
pub struct LoadedProduct {
    pub product: ProductEntity,
    pub variants: Vec<ProductVariantEntity>,
}

impl LoadedProduct {
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }
}

/// Canonical key of a variant combination: option pairs sorted by name,
/// `name=value` joined with `/`.
pub fn variant_key_from_options(options: &BTreeMap<String, String>) -> String {
    options
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("/")
}

/// Fetch the active products referenced by a checkout request, with their
/// variants. Archived or deleted products are simply absent from the map and
/// surface as unavailable during collection.
pub async fn load_products(
    conn: &mut AsyncPgConnection,
    product_ids: &[i32],
) -> Result<HashMap<i32, LoadedProduct>> {
    let product_rows: Vec<ProductEntity> = products::table
        .filter(products::id.eq_any(product_ids))
        .filter(products::status.eq(PRODUCT_STATUS_ACTIVE))
        .get_results(conn)
        .await
        .context("Failed to load products")?;

    let variant_rows: Vec<ProductVariantEntity> = product_variants::table
        .filter(product_variants::product_id.eq_any(product_ids))
        .get_results(conn)
        .await
        .context("Failed to load product variants")?;

    let mut loaded: HashMap<i32, LoadedProduct> = product_rows
        .into_iter()
        .map(|product| {
            (
                product.id,
                LoadedProduct {
                    product,
                    variants: Vec::new(),
                },
            )
        })
        .collect();

    for variant in variant_rows {
        if let Some(entry) = loaded.get_mut(&variant.product_id) {
            entry.variants.push(variant);
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_key_is_sorted_and_canonical() {
        let mut options = BTreeMap::new();
        options.insert("size".to_string(), "m".to_string());
        options.insert("color".to_string(), "red".to_string());
        assert_eq!(variant_key_from_options(&options), "color=red/size=m");
    }

    #[test]
    fn variant_key_of_single_option() {
        let mut options = BTreeMap::new();
        options.insert("size".to_string(), "xl".to_string());
        assert_eq!(variant_key_from_options(&options), "size=xl");
    }
}
