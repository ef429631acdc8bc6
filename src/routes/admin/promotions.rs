use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    checkout::round2,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{ProductEntity, ProductVariantEntity, PromotionRequestEntity},
    schema::{product_variants, products, promotion_requests},
    statuses::RequestStatus,
};

/// Admin decisions over seller promotion requests.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/promotion-requests",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_promotion_requests))
            .routes(utoipa_axum::routes!(approve_promotion_request))
            .routes(utoipa_axum::routes!(reject_promotion_request))
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
        (status = 200, description = "List promotion requests", body = StdResponse<Vec<PromotionRequestEntity>, String>)
    )
)]
async fn list_promotion_requests(
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

    let requests: Vec<PromotionRequestEntity> = promotion_requests::table
        .filter(promotion_requests::status.eq(status))
        .order_by(promotion_requests::created_at.asc())
        .get_results(conn)
        .await
        .context("Failed to get promotion requests")?;

    Ok(StdResponse {
        data: Some(requests),
        message: Some("Get promotion requests successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct ApprovePromotionRes {
    pub request: PromotionRequestEntity,
    pub product: ProductEntity,
}

/// Approve a pending promotion request and apply the discount to the
/// product and all of its variants.
#[utoipa::path(
    post,
    path = "/{id}/approve",
    tags = ["Admin"],
    params(
        ("id" = i32, Path, description = "Promotion request ID to approve")
    ),
    responses(
        (status = 200, description = "Approved promotion request", body = StdResponse<ApprovePromotionRes, String>)
    )
)]
async fn approve_promotion_request(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(admin_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (request, product) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let request: PromotionRequestEntity = diesel::update(
                    promotion_requests::table
                        .find(id)
                        .filter(promotion_requests::status.eq(RequestStatus::Pending.as_str())),
                )
                .set((
                    promotion_requests::status.eq(RequestStatus::Approved.as_str()),
                    promotion_requests::decided_by.eq(Some(admin_id)),
                    promotion_requests::updated_at.eq(diesel::dsl::now),
                ))
                .returning(PromotionRequestEntity::as_returning())
                .get_result(conn)
                .await?;

                let factor = 1.0 - request.discount_percent / 100.0;

                let product: ProductEntity = products::table
                    .find(request.product_id)
                    .get_result(conn)
                    .await?;

                let product: ProductEntity = diesel::update(products::table.find(product.id))
                    .set((
                        products::price.eq(round2(product.price * factor)),
                        products::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(ProductEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to re-price product")?;

                let variants: Vec<ProductVariantEntity> = product_variants::table
                    .filter(product_variants::product_id.eq(product.id))
                    .get_results(conn)
                    .await
                    .context("Failed to get product variants")?;

                for variant in variants {
                    diesel::update(product_variants::table.find(variant.id))
                        .set((
                            product_variants::price.eq(round2(variant.price * factor)),
                            product_variants::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await
                        .context("Failed to re-price product variant")?;
                }

                Ok::<(PromotionRequestEntity, ProductEntity), AppError>((request, product))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(ApprovePromotionRes { request, product }),
        message: Some("Approved promotion request"),
    })
}

/// Reject a pending promotion request.
#[utoipa::path(
    post,
    path = "/{id}/reject",
    tags = ["Admin"],
    params(
        ("id" = i32, Path, description = "Promotion request ID to reject")
    ),
    responses(
        (status = 200, description = "Rejected promotion request", body = StdResponse<PromotionRequestEntity, String>)
    )
)]
async fn reject_promotion_request(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(admin_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let request: PromotionRequestEntity = diesel::update(
        promotion_requests::table
            .find(id)
            .filter(promotion_requests::status.eq(RequestStatus::Pending.as_str())),
    )
    .set((
        promotion_requests::status.eq(RequestStatus::Rejected.as_str()),
        promotion_requests::decided_by.eq(Some(admin_id)),
        promotion_requests::updated_at.eq(diesel::dsl::now),
    ))
    .returning(PromotionRequestEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(request),
        message: Some("Rejected promotion request"),
    })
}
