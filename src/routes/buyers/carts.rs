use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    carts::{cart_items_of, ensure_active_cart, recompute_cart_aggregates},
    checkout::{self, RequestedLine, collect_items},
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{CartEntity, CartItemEntity, CreateCartItemEntity},
    schema::{cart_items, carts},
};

/// Defines all buyer-facing cart routes (cart view + item mutations).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/buyers/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_cart))
            .routes(utoipa_axum::routes!(add_cart_item))
            .routes(utoipa_axum::routes!(update_cart_item))
            .routes(utoipa_axum::routes!(delete_cart_item))
            .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
    )
}

#[derive(Serialize, ToSchema)]
struct CartRes {
    pub cart: CartEntity,
    pub cart_items: Vec<CartItemEntity>,
}

/// Fetch the authenticated buyer's active cart, creating it on first use.
#[utoipa::path(
    get,
    path = "/my-cart",
    tags = ["Carts"],
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<CartRes, String>)
    )
)]
async fn get_my_cart(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart = ensure_active_cart(conn, buyer_id).await?;
    let cart_items = cart_items_of(conn, cart.id).await?;

    Ok(StdResponse {
        data: Some(CartRes { cart, cart_items }),
        message: Some("Get cart successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct AddCartItemReq {
    pub product_id: i32,
    pub variant_key: Option<String>,
    pub quantity: i32,
}

/// Add an item to the cart. Stock is re-validated for the combined quantity
/// when the same product/variant is already present, and the unit price
/// snapshot is refreshed.
#[utoipa::path(
    post,
    path = "/items",
    tags = ["Carts"],
    request_body = AddCartItemReq,
    responses(
        (status = 200, description = "Added item to cart", body = StdResponse<CartRes, String>)
    )
)]
async fn add_cart_item(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<AddCartItemReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.quantity <= 0 {
        return Err(AppError::BadRequest("Quantity must be positive".to_string()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (cart, cart_items) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cart = ensure_active_cart(conn, buyer_id).await?;

                let rows: Vec<CartItemEntity> = cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .filter(cart_items::product_id.eq(body.product_id))
                    .get_results(conn)
                    .await
                    .context("Failed to look up cart item")?;
                let existing = rows
                    .into_iter()
                    .find(|row| row.variant_key == body.variant_key);

                let combined_quantity =
                    body.quantity + existing.as_ref().map_or(0, |item| item.quantity);

                let loaded = checkout::load_products(conn, &[body.product_id]).await?;
                let line = RequestedLine {
                    cart_item_id: existing.as_ref().map(|item| item.id),
                    product_id: body.product_id,
                    variant_key: body.variant_key.clone(),
                    quantity: combined_quantity,
                };
                let collection = collect_items(buyer_id, &[line], &loaded);
                if let Some(rejected) = collection.unavailable.as_slice().first() {
                    return Err(AppError::BadRequest(rejected.reason.clone()));
                }
                let payable = &collection.payable[0];

                match existing {
                    Some(item) => {
                        diesel::update(cart_items::table.find(item.id))
                            .set((
                                cart_items::quantity.eq(combined_quantity),
                                cart_items::unit_price.eq(payable.unit_price),
                                cart_items::updated_at.eq(diesel::dsl::now),
                            ))
                            .execute(conn)
                            .await
                            .context("Failed to update cart item")?;
                    }
                    None => {
                        diesel::insert_into(cart_items::table)
                            .values(CreateCartItemEntity {
                                cart_id: cart.id,
                                product_id: body.product_id,
                                seller_id: payable.seller_id,
                                variant_key: body.variant_key.clone(),
                                quantity: body.quantity,
                                unit_price: payable.unit_price,
                            })
                            .execute(conn)
                            .await
                            .context("Failed to create cart item")?;
                    }
                }

                let updated_cart = recompute_cart_aggregates(conn, cart.id).await?;
                let cart_items = cart_items_of(conn, cart.id).await?;

                Ok::<(CartEntity, Vec<CartItemEntity>), AppError>((updated_cart, cart_items))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(CartRes { cart, cart_items }),
        message: Some("Added item to cart"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateCartItemReq {
    pub quantity: i32,
}

/// Change the quantity of a cart item, re-validating stock for the new
/// quantity.
#[utoipa::path(
    patch,
    path = "/items/{id}",
    tags = ["Carts"],
    params(
        ("id" = i32, Path, description = "Cart item ID to update")
    ),
    request_body = UpdateCartItemReq,
    responses(
        (status = 200, description = "Updated cart item", body = StdResponse<CartRes, String>)
    )
)]
async fn update_cart_item(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<UpdateCartItemReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.quantity <= 0 {
        return Err(AppError::BadRequest(
            "Quantity must be positive; delete the item instead".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (cart, cart_items) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let item: CartItemEntity = cart_items::table
                    .inner_join(carts::table)
                    .filter(cart_items::id.eq(id))
                    .filter(carts::buyer_id.eq(buyer_id))
                    .select(CartItemEntity::as_select())
                    .first(conn)
                    .await?;

                let loaded = checkout::load_products(conn, &[item.product_id]).await?;
                let line = RequestedLine {
                    cart_item_id: Some(item.id),
                    product_id: item.product_id,
                    variant_key: item.variant_key.clone(),
                    quantity: body.quantity,
                };
                let collection = collect_items(buyer_id, &[line], &loaded);
                if let Some(rejected) = collection.unavailable.as_slice().first() {
                    return Err(AppError::BadRequest(rejected.reason.clone()));
                }
                let payable = &collection.payable[0];

                diesel::update(cart_items::table.find(item.id))
                    .set((
                        cart_items::quantity.eq(body.quantity),
                        cart_items::unit_price.eq(payable.unit_price),
                        cart_items::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await
                    .context("Failed to update cart item")?;

                let updated_cart = recompute_cart_aggregates(conn, item.cart_id).await?;
                let cart_items = cart_items_of(conn, item.cart_id).await?;

                Ok::<(CartEntity, Vec<CartItemEntity>), AppError>((updated_cart, cart_items))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(CartRes { cart, cart_items }),
        message: Some("Updated cart item"),
    })
}

/// Remove an item from the cart.
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tags = ["Carts"],
    params(
        ("id" = i32, Path, description = "Cart item ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted cart item", body = StdResponse<CartRes, String>)
    )
)]
async fn delete_cart_item(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (cart, cart_items) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let item: CartItemEntity = cart_items::table
                    .inner_join(carts::table)
                    .filter(cart_items::id.eq(id))
                    .filter(carts::buyer_id.eq(buyer_id))
                    .select(CartItemEntity::as_select())
                    .first(conn)
                    .await?;

                diesel::delete(cart_items::table.find(item.id))
                    .execute(conn)
                    .await
                    .context("Failed to delete cart item")?;

                let updated_cart = recompute_cart_aggregates(conn, item.cart_id).await?;
                let cart_items = cart_items_of(conn, item.cart_id).await?;

                Ok::<(CartEntity, Vec<CartItemEntity>), AppError>((updated_cart, cart_items))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(CartRes { cart, cart_items }),
        message: Some("Deleted cart item"),
    })
}
