use std::collections::HashMap;

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

use super::checkout::{
    CheckoutConfirmReq, CheckoutItemReq, PAYMENT_SIMULATION_SUCCESS, load_shipping_address,
    run_confirm,
};
use crate::{
    checkout::{CheckoutSource, materialize},
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{OrderEntity, OrderItemEntity, OrderStatusHistoryEntity},
    schema::{order_items, order_status_history, orders},
    statuses::{OrderStatus, ensure_order_transition},
};

/// Defines all buyer-facing order routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/buyers/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(get_my_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(cancel_order))
            .routes(utoipa_axum::routes!(update_shipping_address))
            .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
struct LegacyCreateOrderReq {
    items: Vec<CheckoutItemReq>,
    shipping_address_id: Option<i32>,
}

/// Legacy order creation: a buy-now checkout with a successful payment
/// simulation, kept as a thin adapter over the confirm flow.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = LegacyCreateOrderReq,
    responses(
        (status = 201, description = "Created orders successfully")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<LegacyCreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let (status, res) = run_confirm(
        state,
        buyer_id,
        CheckoutConfirmReq {
            source: CheckoutSource::BuyNow,
            cart_item_ids: None,
            items: Some(body.items),
            payment_simulation: PAYMENT_SIMULATION_SUCCESS.to_string(),
            shipping_address_id: body.shipping_address_id,
        },
    )
    .await?;

    Ok((status, res))
}

#[derive(Serialize, ToSchema)]
struct OrderWithItems {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}

/// Fetch all orders belonging to the authenticated buyer.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Orders"],
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<OrderWithItems>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_orders: Vec<OrderEntity> = orders::table
        .filter(orders::buyer_id.eq(buyer_id))
        .order_by(orders::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my orders")?;

    let order_ids: Vec<i32> = my_orders.iter().map(|order| order.id).collect();
    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq_any(&order_ids))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let mut group: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
    for item in items {
        group.entry(item.order_id).or_default().push(item);
    }

    let orders_with_items: Vec<OrderWithItems> = my_orders
        .into_iter()
        .map(|order| OrderWithItems {
            items: group.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(StdResponse {
        data: Some(orders_with_items),
        message: Some("Get my orders successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct GetOrderRes {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
    pub history: Vec<OrderStatusHistoryEntity>,
}

/// Fetch a specific order belonging to the authenticated buyer.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<GetOrderRes, String>)
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .filter(orders::buyer_id.eq(buyer_id))
        .get_result(conn)
        .await?;

    let items: Vec<OrderItemEntity> = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .get_results(conn)
        .await
        .context("Failed to get order items")?;

    let history: Vec<OrderStatusHistoryEntity> = order_status_history::table
        .filter(order_status_history::order_id.eq(order.id))
        .order_by(order_status_history::created_at.asc())
        .get_results(conn)
        .await
        .context("Failed to get status history")?;

    Ok(StdResponse {
        data: Some(GetOrderRes {
            order,
            items,
            history,
        }),
        message: Some("Get order successfully"),
    })
}

/// Cancel an order before shipment. The transition table decides which
/// states the buyer may cancel from.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Orders"],
    params(
        ("id" = i32, Path, description = "Order ID to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled order successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn cancel_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cancelled_order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = orders::table
                    .find(id)
                    .filter(orders::buyer_id.eq(buyer_id))
                    .get_result(conn)
                    .await?;

                ensure_order_transition(&order.status, OrderStatus::Cancelled)?;

                let cancelled_order: OrderEntity = diesel::update(orders::table.find(order.id))
                    .set((
                        orders::status.eq(OrderStatus::Cancelled.as_str()),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to cancel order")?;

                materialize::append_history(
                    conn,
                    cancelled_order.id,
                    OrderStatus::Cancelled,
                    Some("Cancelled by buyer".to_string()),
                )
                .await?;

                Ok::<OrderEntity, AppError>(cancelled_order)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(cancelled_order),
        message: Some("Cancelled order successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateShippingAddressReq {
    address_id: i32,
}

/// Replace the order's shipping address. Allowed only while the order has
/// not shipped.
#[utoipa::path(
    patch,
    path = "/{id}/shipping-address",
    tags = ["Orders"],
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = UpdateShippingAddressReq,
    responses(
        (status = 200, description = "Updated shipping address", body = StdResponse<OrderEntity, String>)
    )
)]
async fn update_shipping_address(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<UpdateShippingAddressReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated_order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = orders::table
                    .find(id)
                    .filter(orders::buyer_id.eq(buyer_id))
                    .get_result(conn)
                    .await?;

                let status = order.status.parse::<OrderStatus>()?;
                if !status.shipping_address_mutable() {
                    return Err(AppError::ForbiddenResource(
                        "Shipping address can no longer be changed".to_string(),
                    ));
                }

                let shipping_address =
                    load_shipping_address(conn, buyer_id, body.address_id).await?;

                let updated_order: OrderEntity = diesel::update(orders::table.find(order.id))
                    .set((
                        orders::shipping_address.eq(Some(shipping_address)),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to update shipping address")?;

                Ok::<OrderEntity, AppError>(updated_order)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(updated_order),
        message: Some("Updated shipping address"),
    })
}
