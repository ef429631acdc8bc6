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

use crate::{
    checkout::materialize,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{OrderEntity, OrderItemEntity, OrderStatusHistoryEntity},
    schema::{order_items, order_status_history, orders},
    statuses::{OrderStatus, ensure_order_transition},
};

/// Defines seller-facing order routes (fulfilment side).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/sellers/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(update_order_status))
            .route_layer(axum::middleware::from_fn(middleware::sellers_authorization)),
    )
}

#[derive(Serialize, ToSchema)]
struct OrderWithItems {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}

/// Fetch all orders sold by the authenticated seller.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Seller orders"],
    responses(
        (status = 200, description = "List seller orders", body = StdResponse<Vec<OrderWithItems>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_orders: Vec<OrderEntity> = orders::table
        .filter(orders::seller_id.eq(seller_id))
        .order_by(orders::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get seller orders")?;

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
        message: Some("Get seller orders successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct GetOrderRes {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
    pub history: Vec<OrderStatusHistoryEntity>,
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Seller orders"],
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
    Extension(seller_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(id)
        .filter(orders::seller_id.eq(seller_id))
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

#[derive(Deserialize, ToSchema)]
struct UpdateOrderStatusReq {
    status: OrderStatus,
    note: Option<String>,
}

const SELLER_ASSIGNABLE: [OrderStatus; 5] = [
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
    OrderStatus::Returned,
];

/// Advance an order through its lifecycle. Payment outcomes are not
/// seller-assignable, and illegal transitions are rejected.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Seller orders"],
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Updated order status", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Illegal status transition")
    )
)]
async fn update_order_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
    Json(body): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    if !SELLER_ASSIGNABLE.contains(&body.status) {
        return Err(AppError::BadRequest(format!(
            "{} is not a seller-assignable status",
            body.status
        )));
    }

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
                    .filter(orders::seller_id.eq(seller_id))
                    .get_result(conn)
                    .await?;

                ensure_order_transition(&order.status, body.status)?;

                let updated_order: OrderEntity = diesel::update(orders::table.find(order.id))
                    .set((
                        orders::status.eq(body.status.as_str()),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to update order status")?;

                materialize::append_history(conn, updated_order.id, body.status, body.note).await?;

                Ok::<OrderEntity, AppError>(updated_order)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(updated_order),
        message: Some("Updated order status"),
    })
}
