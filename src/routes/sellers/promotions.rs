use anyhow::Context;
use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{CreatePromotionRequestEntity, ProductEntity, PromotionRequestEntity},
    schema::{products, promotion_requests},
    statuses::RequestStatus,
};

/// Defines seller promotion routes: propose a discount on an own product.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/sellers/promotions",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_promotion_request))
            .routes(utoipa_axum::routes!(get_my_promotion_requests))
            .route_layer(axum::middleware::from_fn(middleware::sellers_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreatePromotionRequestReq {
    product_id: i32,
    discount_percent: f64,
}

/// Propose a promotion for one of the seller's products. Approval re-prices
/// the product; until then nothing changes.
#[utoipa::path(
    post,
    path = "/requests",
    tags = ["Promotions"],
    request_body = CreatePromotionRequestReq,
    responses(
        (status = 200, description = "Created promotion request", body = StdResponse<PromotionRequestEntity, String>)
    )
)]
async fn create_promotion_request(
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
    Json(body): Json<CreatePromotionRequestReq>,
) -> Result<impl IntoResponse, AppError> {
    if !(1.0..=90.0).contains(&body.discount_percent) {
        return Err(AppError::BadRequest(
            "Discount percent must be between 1 and 90".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let _product: ProductEntity = products::table
        .find(body.product_id)
        .filter(products::seller_id.eq(seller_id))
        .get_result(conn)
        .await?;

    let pending: i64 = promotion_requests::table
        .filter(promotion_requests::product_id.eq(body.product_id))
        .filter(promotion_requests::status.eq(RequestStatus::Pending.as_str()))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check promotion requests")?;
    if pending > 0 {
        return Err(AppError::BadRequest(
            "A promotion request is already pending for this product".to_string(),
        ));
    }

    let request: PromotionRequestEntity = diesel::insert_into(promotion_requests::table)
        .values(CreatePromotionRequestEntity {
            seller_id,
            product_id: body.product_id,
            discount_percent: body.discount_percent,
            status: RequestStatus::Pending.as_str().to_string(),
        })
        .returning(PromotionRequestEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create promotion request")?;

    Ok(StdResponse {
        data: Some(request),
        message: Some("Created promotion request"),
    })
}

#[utoipa::path(
    get,
    path = "/requests",
    tags = ["Promotions"],
    responses(
        (status = 200, description = "List my promotion requests", body = StdResponse<Vec<PromotionRequestEntity>, String>)
    )
)]
async fn get_my_promotion_requests(
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let requests: Vec<PromotionRequestEntity> = promotion_requests::table
        .filter(promotion_requests::seller_id.eq(seller_id))
        .order_by(promotion_requests::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get promotion requests")?;

    Ok(StdResponse {
        data: Some(requests),
        message: Some("Get promotion requests successfully"),
    })
}
