use anyhow::{Context, Result};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::{PayableItem, UnavailableItem};
use crate::schema::{product_variants, products};

/// Decrement stock for every payable item. Each decrement is conditional
/// (`quantity >= requested`), so a concurrent checkout that got there first
/// surfaces as a conflict instead of negative stock. Must run inside the
/// confirm transaction; a non-empty conflict list aborts it.
pub async fn deduct(
    conn: &mut AsyncPgConnection,
    items: &[PayableItem],
) -> Result<Vec<UnavailableItem>> {
    let mut conflicts = Vec::new();

    for item in items {
        let deducted = match &item.variant_key {
            Some(key) => {
                let updated = diesel::update(
                    product_variants::table
                        .filter(product_variants::product_id.eq(item.product_id))
                        .filter(product_variants::variant_key.eq(key))
                        .filter(product_variants::quantity.ge(item.quantity)),
                )
                .set((
                    product_variants::quantity.eq(product_variants::quantity - item.quantity),
                    product_variants::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)
                .await
                .context("Failed to decrement variant stock")?;

                if updated > 0 {
                    recompute_aggregate_stock(conn, item.product_id).await?;
                }
                updated > 0
            }
            None => {
                diesel::update(
                    products::table
                        .find(item.product_id)
                        .filter(products::stock.ge(item.quantity)),
                )
                .set((
                    products::stock.eq(products::stock - item.quantity),
                    products::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)
                .await
                .context("Failed to decrement product stock")?
                    > 0
            }
        };

        if !deducted {
            conflicts.push(UnavailableItem {
                cart_item_id: item.cart_item_id,
                product_id: Some(item.product_id),
                variant_key: item.variant_key.clone(),
                requested_quantity: item.quantity,
                available_stock: current_stock(conn, item).await?,
                reason: "Stock changed before payment".to_string(),
            });
        }
    }

    Ok(conflicts)
}

async fn current_stock(conn: &mut AsyncPgConnection, item: &PayableItem) -> Result<i32> {
    let stock = match &item.variant_key {
        Some(key) => product_variants::table
            .filter(product_variants::product_id.eq(item.product_id))
            .filter(product_variants::variant_key.eq(key))
            .select(product_variants::quantity)
            .get_result(conn)
            .await
            .optional()
            .context("Failed to read variant stock")?,
        None => products::table
            .find(item.product_id)
            .select(products::stock)
            .get_result(conn)
            .await
            .optional()
            .context("Failed to read product stock")?,
    };

    Ok(stock.unwrap_or(0))
}

/// The flat `stock` column of a variant-bearing product mirrors the sum of
/// its variants' quantities.
pub async fn recompute_aggregate_stock(
    conn: &mut AsyncPgConnection,
    product_id: i32,
) -> Result<()> {
    let total: Option<i64> = product_variants::table
        .filter(product_variants::product_id.eq(product_id))
        .select(diesel::dsl::sum(product_variants::quantity))
        .get_result(conn)
        .await
        .context("Failed to sum variant stock")?;

    diesel::update(products::table.find(product_id))
        .set((
            products::stock.eq(total.unwrap_or(0) as i32),
            products::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await
        .context("Failed to update aggregate stock")?;

    Ok(())
}
