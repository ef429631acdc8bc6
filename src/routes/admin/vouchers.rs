use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{CreateVoucherEntity, VoucherEntity, VoucherRequestEntity},
    routes::vouchers::VOUCHER_STATUS_ACTIVE,
    schema::{voucher_requests, vouchers},
    statuses::RequestStatus,
};

/// Admin decisions over seller voucher requests.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/voucher-requests",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_voucher_requests))
            .routes(utoipa_axum::routes!(approve_voucher_request))
            .routes(utoipa_axum::routes!(reject_voucher_request))
            .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
    )
}

#[derive(Deserialize, IntoParams)]
struct ListRequestsParams {
    /// Filter by request status; defaults to pending.
    status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    params(ListRequestsParams),
    responses(
        (status = 200, description = "List voucher requests", body = StdResponse<Vec<VoucherRequestEntity>, String>)
    )
)]
async fn list_voucher_requests(
    State(state): State<AppState>,
    Extension(_admin_id): Extension<i32>,
    Query(params): Query<ListRequestsParams>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let status = params
        .status
        .unwrap_or_else(|| RequestStatus::Pending.as_str().to_string());

    let requests: Vec<VoucherRequestEntity> = voucher_requests::table
        .filter(voucher_requests::status.eq(status))
        .order_by(voucher_requests::created_at.asc())
        .get_results(conn)
        .await
        .context("Failed to get voucher requests")?;

    Ok(StdResponse {
        data: Some(requests),
        message: Some("Get voucher requests successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct ApproveVoucherReq {
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
struct ApproveVoucherRes {
    pub request: VoucherRequestEntity,
    pub voucher: VoucherEntity,
}

/// Approve a pending voucher request and materialize the voucher.
#[utoipa::path(
    post,
    path = "/{id}/approve",
    tags = ["Admin"],
    params(
        ("id" = i32, Path, description = "Voucher request ID to approve")
    ),
    request_body = ApproveVoucherReq,
    responses(
        (status = 200, description = "Approved voucher request", body = StdResponse<ApproveVoucherRes, String>)
    )
)]
async fn approve_voucher_request(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(admin_id): Extension<i32>,
    Json(body): Json<ApproveVoucherReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (request, voucher) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                // Only a still-pending request can be decided.
                let request: VoucherRequestEntity = diesel::update(
                    voucher_requests::table
                        .find(id)
                        .filter(voucher_requests::status.eq(RequestStatus::Pending.as_str())),
                )
                .set((
                    voucher_requests::status.eq(RequestStatus::Approved.as_str()),
                    voucher_requests::decided_by.eq(Some(admin_id)),
                    voucher_requests::updated_at.eq(diesel::dsl::now),
                ))
                .returning(VoucherRequestEntity::as_returning())
                .get_result(conn)
                .await?;

                let voucher: VoucherEntity = diesel::insert_into(vouchers::table)
                    .values(CreateVoucherEntity {
                        seller_id: request.seller_id,
                        code: request.code.clone(),
                        discount_percent: request.discount_percent,
                        min_order_amount: request.min_order_amount,
                        status: VOUCHER_STATUS_ACTIVE.to_string(),
                        expires_at: body.expires_at,
                    })
                    .returning(VoucherEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create voucher")?;

                Ok::<(VoucherRequestEntity, VoucherEntity), AppError>((request, voucher))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(ApproveVoucherRes { request, voucher }),
        message: Some("Approved voucher request"),
    })
}

/// Reject a pending voucher request.
#[utoipa::path(
    post,
    path = "/{id}/reject",
    tags = ["Admin"],
    params(
        ("id" = i32, Path, description = "Voucher request ID to reject")
    ),
    responses(
        (status = 200, description = "Rejected voucher request", body = StdResponse<VoucherRequestEntity, String>)
    )
)]
async fn reject_voucher_request(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(admin_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let request: VoucherRequestEntity = diesel::update(
        voucher_requests::table
            .find(id)
            .filter(voucher_requests::status.eq(RequestStatus::Pending.as_str())),
    )
    .set((
        voucher_requests::status.eq(RequestStatus::Rejected.as_str()),
        voucher_requests::decided_by.eq(Some(admin_id)),
        voucher_requests::updated_at.eq(diesel::dsl::now),
    ))
    .returning(VoucherRequestEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(request),
        message: Some("Rejected voucher request"),
    })
}
