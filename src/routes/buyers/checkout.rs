use anyhow::Context;
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    carts::{ensure_active_cart, recompute_cart_aggregates},
    checkout::{
        self, CheckoutSource, CheckoutTotals, CreatedOrder, ItemCollection, RequestedLine,
        SellerGroup, UnavailableItem, collect_items, group_by_seller,
        materialize, pricing, stock,
    },
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{AddressEntity, CartItemEntity},
    schema::{addresses, cart_items},
    statuses::OrderStatus,
};

pub const PAYMENT_SIMULATION_SUCCESS: &str = "success";

/// Defines the checkout orchestration routes (preview + confirm).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/buyers/checkout",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(preview_checkout))
            .routes(utoipa_axum::routes!(confirm_checkout))
            .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
    )
}

#[derive(Deserialize, Clone, ToSchema)]
pub struct CheckoutItemReq {
    pub product_id: i32,
    pub variant_key: Option<String>,
    pub quantity: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckoutPreviewReq {
    pub source: CheckoutSource,
    pub cart_item_ids: Option<Vec<i32>>,
    pub items: Option<Vec<CheckoutItemReq>>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckoutConfirmReq {
    pub source: CheckoutSource,
    pub cart_item_ids: Option<Vec<i32>>,
    pub items: Option<Vec<CheckoutItemReq>>,
    pub payment_simulation: String,
    pub shipping_address_id: Option<i32>,
}

struct ResolvedSelection {
    lines: Vec<RequestedLine>,
    missing: Vec<UnavailableItem>,
    cart_id: Option<i32>,
}

/// Turn a checkout request into concrete requested lines. Cart selections
/// resolve against the buyer's active cart; ids that no longer exist are
/// reported as unavailable rather than failing the whole request.
async fn resolve_selection(
    conn: &mut AsyncPgConnection,
    buyer_id: i32,
    source: CheckoutSource,
    cart_item_ids: &Option<Vec<i32>>,
    items: &Option<Vec<CheckoutItemReq>>,
) -> Result<ResolvedSelection, AppError> {
    match source {
        CheckoutSource::Cart => {
            let ids = cart_item_ids.clone().unwrap_or_default();
            if ids.is_empty() {
                return Err(AppError::BadRequest(
                    "cart_item_ids is required for a cart checkout".to_string(),
                ));
            }

            let cart = ensure_active_cart(conn, buyer_id).await?;
            let rows: Vec<CartItemEntity> = cart_items::table
                .filter(cart_items::cart_id.eq(cart.id))
                .filter(cart_items::id.eq_any(&ids))
                .get_results(conn)
                .await
                .context("Failed to get cart items")?;

            let missing = ids
                .iter()
                .filter(|id| !rows.iter().any(|row| row.id == **id))
                .map(|id| UnavailableItem {
                    cart_item_id: Some(*id),
                    product_id: None,
                    variant_key: None,
                    requested_quantity: 0,
                    available_stock: 0,
                    reason: "Cart item no longer exists".to_string(),
                })
                .collect();

            let lines = rows
                .into_iter()
                .map(|row| RequestedLine {
                    cart_item_id: Some(row.id),
                    product_id: row.product_id,
                    variant_key: row.variant_key,
                    quantity: row.quantity,
                })
                .collect();

            Ok(ResolvedSelection {
                lines,
                missing,
                cart_id: Some(cart.id),
            })
        }
        CheckoutSource::BuyNow => {
            let items = items.clone().unwrap_or_default();
            if items.is_empty() {
                return Err(AppError::BadRequest(
                    "items is required for a buy-now checkout".to_string(),
                ));
            }

            let lines = items
                .into_iter()
                .map(|item| RequestedLine {
                    cart_item_id: None,
                    product_id: item.product_id,
                    variant_key: item.variant_key,
                    quantity: item.quantity,
                })
                .collect();

            Ok(ResolvedSelection {
                lines,
                missing: Vec::new(),
                cart_id: None,
            })
        }
    }
}

pub(crate) async fn load_shipping_address(
    conn: &mut AsyncPgConnection,
    buyer_id: i32,
    address_id: i32,
) -> Result<Value, AppError> {
    let address: AddressEntity = addresses::table
        .find(address_id)
        .filter(addresses::user_id.eq(buyer_id))
        .first(conn)
        .await
        .map_err(|_| {
            AppError::ForbiddenResource("Buyer does not own this shipping address".to_string())
        })?;

    Ok(serde_json::to_value(&address).context("Failed to serialize shipping address")?)
}

#[derive(Serialize, ToSchema)]
pub struct CheckoutPreviewRes {
    pub groups: Vec<SellerGroup>,
    pub totals: CheckoutTotals,
    pub payable_item_count: i32,
    pub out_of_stock_items: Vec<UnavailableItem>,
    pub can_proceed: bool,
}

/// Compute the checkout summary without side effects: validated seller
/// groups and totals, plus every rejected item with its reason.
#[utoipa::path(
    post,
    path = "/preview",
    tags = ["Checkout"],
    request_body = CheckoutPreviewReq,
    responses(
        (status = 200, description = "Checkout preview computed", body = StdResponse<CheckoutPreviewRes, String>)
    )
)]
async fn preview_checkout(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<CheckoutPreviewReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let ResolvedSelection { lines, missing, .. } =
        resolve_selection(conn, buyer_id, body.source, &body.cart_item_ids, &body.items).await?;

    let product_ids: Vec<i32> = lines.iter().map(|line| line.product_id).collect();
    let loaded = checkout::load_products(conn, &product_ids).await?;
    let ItemCollection {
        payable,
        unavailable,
    } = collect_items(buyer_id, &lines, &loaded);

    let groups = group_by_seller(&payable);
    let totals = pricing::totals(&groups);

    let mut out_of_stock_items = missing;
    out_of_stock_items.extend(unavailable);

    Ok(StdResponse {
        data: Some(CheckoutPreviewRes {
            payable_item_count: payable.len() as i32,
            can_proceed: !payable.is_empty(),
            groups,
            totals,
            out_of_stock_items,
        }),
        message: Some("Checkout preview computed"),
    })
}

#[derive(Serialize, ToSchema)]
pub struct CheckoutConfirmRes {
    pub payment_status: String,
    pub orders: Vec<CreatedOrder>,
    pub out_of_stock_items: Vec<UnavailableItem>,
    pub redirect_to: String,
}

/// Shared confirm flow, also used by the legacy order-creation endpoint.
///
/// On a successful payment simulation the whole mutation runs in one
/// transaction: conditional stock decrements (any conflict aborts with a
/// 409 and rolls everything back), per-seller order creation, and cart
/// cleanup for cart-sourced checkouts.
pub(crate) async fn run_confirm(
    state: AppState,
    buyer_id: i32,
    body: CheckoutConfirmReq,
) -> Result<(StatusCode, StdResponse<CheckoutConfirmRes, &'static str>), AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let shipping_address = match body.shipping_address_id {
        Some(address_id) => Some(load_shipping_address(conn, buyer_id, address_id).await?),
        None => None,
    };

    let ResolvedSelection {
        lines,
        missing,
        cart_id,
    } = resolve_selection(conn, buyer_id, body.source, &body.cart_item_ids, &body.items).await?;

    let product_ids: Vec<i32> = lines.iter().map(|line| line.product_id).collect();
    let loaded = checkout::load_products(conn, &product_ids).await?;
    let ItemCollection {
        payable,
        unavailable,
    } = collect_items(buyer_id, &lines, &loaded);

    let mut out_of_stock_items = missing;
    out_of_stock_items.extend(unavailable);

    if payable.is_empty() {
        return Err(AppError::BadRequest(
            "No purchasable items in checkout request".to_string(),
        ));
    }

    let groups = group_by_seller(&payable);
    let simulation_success = body.payment_simulation == PAYMENT_SIMULATION_SUCCESS;

    let orders = conn
        .transaction(move |conn| {
            Box::pin(async move {
                if !simulation_success {
                    // No deduction on a declined payment; the failed orders
                    // are still recorded for the buyer to retry from.
                    let orders = materialize::create_orders(
                        conn,
                        buyer_id,
                        &groups,
                        OrderStatus::Failed,
                        shipping_address,
                    )
                    .await?;
                    return Ok::<Vec<CreatedOrder>, AppError>(orders);
                }

                // Conditional decrements re-validate stock at the moment of
                // payment; a concurrent checkout that won the race surfaces
                // here as a conflict and aborts the transaction.
                let conflicts = stock::deduct(conn, &payable).await?;
                if !conflicts.is_empty() {
                    return Err(AppError::StockConflict(conflicts));
                }

                let orders = materialize::create_orders(
                    conn,
                    buyer_id,
                    &groups,
                    OrderStatus::Paid,
                    shipping_address,
                )
                .await?;

                if let Some(cart_id) = cart_id {
                    let consumed: Vec<i32> = payable
                        .iter()
                        .filter_map(|item| item.cart_item_id)
                        .collect();
                    diesel::delete(cart_items::table.filter(cart_items::id.eq_any(&consumed)))
                        .execute(conn)
                        .await
                        .context("Failed to delete consumed cart items")?;
                    recompute_cart_aggregates(conn, cart_id).await?;
                }

                Ok(orders)
            })
        })
        .await?;

    let (payment_status, redirect_to) = if simulation_success {
        ("success", "/buyers/orders?payment=success")
    } else {
        ("failed", "/buyers/checkout?payment=failed")
    };

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(CheckoutConfirmRes {
                payment_status: payment_status.to_string(),
                orders,
                out_of_stock_items,
                redirect_to: redirect_to.to_string(),
            }),
            message: Some("Checkout confirmed"),
        },
    ))
}

/// Confirm a checkout: validate, simulate payment, deduct stock and create
/// one order per seller.
#[utoipa::path(
    post,
    path = "/confirm",
    tags = ["Checkout"],
    request_body = CheckoutConfirmReq,
    responses(
        (status = 201, description = "Checkout confirmed", body = StdResponse<CheckoutConfirmRes, String>),
        (status = 400, description = "No purchasable items"),
        (status = 409, description = "Stock changed before payment")
    )
)]
async fn confirm_checkout(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<CheckoutConfirmReq>,
) -> Result<impl IntoResponse, AppError> {
    let (status, res) = run_confirm(state, buyer_id, body).await?;
    Ok((status, res))
}
