//! Shared cart persistence helpers, used by the cart routes and by checkout
//! cleanup.

use anyhow::{Context, Result};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::checkout::round2;
use crate::models::{CartEntity, CartItemEntity, CreateCartEntity};
use crate::schema::{cart_items, carts};

pub const CART_STATUS_ACTIVE: &str = "active";

/// Fetch the buyer's active cart, creating it on first use.
pub async fn ensure_active_cart(
    conn: &mut AsyncPgConnection,
    buyer_id: i32,
) -> Result<CartEntity> {
    let existing: Option<CartEntity> = carts::table
        .filter(carts::buyer_id.eq(buyer_id))
        .filter(carts::status.eq(CART_STATUS_ACTIVE))
        .first(conn)
        .await
        .optional()
        .context("Failed to look up cart")?;

    if let Some(cart) = existing {
        return Ok(cart);
    }

    diesel::insert_into(carts::table)
        .values(CreateCartEntity {
            buyer_id,
            status: CART_STATUS_ACTIVE.to_string(),
        })
        .returning(CartEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create cart")
}

pub async fn cart_items_of(
    conn: &mut AsyncPgConnection,
    cart_id: i32,
) -> Result<Vec<CartItemEntity>> {
    cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .order_by(cart_items::created_at.asc())
        .get_results(conn)
        .await
        .context("Failed to get cart items")
}

/// Recompute the derived `total_items`/`total_price` aggregates from the
/// rows that remain. Runs after every cart mutation and after checkout
/// consumes items; the aggregates are never trusted as authoritative.
pub async fn recompute_cart_aggregates(
    conn: &mut AsyncPgConnection,
    cart_id: i32,
) -> Result<CartEntity> {
    let items: Vec<CartItemEntity> = cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .get_results(conn)
        .await
        .context("Failed to get cart items")?;

    let total_items: i32 = items.iter().map(|item| item.quantity).sum();
    let total_price = round2(
        items
            .iter()
            .map(|item| round2(item.unit_price * item.quantity as f64))
            .sum::<f64>(),
    );

    diesel::update(carts::table.find(cart_id))
        .set((
            carts::total_items.eq(total_items),
            carts::total_price.eq(total_price),
            carts::updated_at.eq(diesel::dsl::now),
        ))
        .returning(CartEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to update cart aggregates")
}
