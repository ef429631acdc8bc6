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
    models::{CreateVoucherRequestEntity, VoucherEntity, VoucherRequestEntity},
    schema::{voucher_requests, vouchers},
    statuses::RequestStatus,
};

/// Defines seller voucher routes: submit requests for admin approval and
/// list what has been granted.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/sellers/vouchers",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_voucher_request))
            .routes(utoipa_axum::routes!(get_my_voucher_requests))
            .routes(utoipa_axum::routes!(get_my_vouchers))
            .route_layer(axum::middleware::from_fn(middleware::sellers_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreateVoucherRequestReq {
    code: String,
    discount_percent: f64,
    #[serde(default)]
    min_order_amount: f64,
}

/// Submit a voucher proposal; it only takes effect once an admin approves.
#[utoipa::path(
    post,
    path = "/requests",
    tags = ["Vouchers"],
    request_body = CreateVoucherRequestReq,
    responses(
        (status = 200, description = "Created voucher request", body = StdResponse<VoucherRequestEntity, String>)
    )
)]
async fn create_voucher_request(
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
    Json(body): Json<CreateVoucherRequestReq>,
) -> Result<impl IntoResponse, AppError> {
    let code = body.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::BadRequest("Voucher code must not be empty".to_string()));
    }
    if !(1.0..=90.0).contains(&body.discount_percent) {
        return Err(AppError::BadRequest(
            "Discount percent must be between 1 and 90".to_string(),
        ));
    }
    if body.min_order_amount < 0.0 {
        return Err(AppError::BadRequest(
            "Minimum order amount must not be negative".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let existing_voucher: i64 = vouchers::table
        .filter(vouchers::seller_id.eq(seller_id))
        .filter(vouchers::code.eq(&code))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check voucher code")?;
    let pending_request: i64 = voucher_requests::table
        .filter(voucher_requests::seller_id.eq(seller_id))
        .filter(voucher_requests::code.eq(&code))
        .filter(voucher_requests::status.eq(RequestStatus::Pending.as_str()))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check voucher requests")?;
    if existing_voucher > 0 || pending_request > 0 {
        return Err(AppError::BadRequest(format!(
            "Voucher code {code} is already in use"
        )));
    }

    let request: VoucherRequestEntity = diesel::insert_into(voucher_requests::table)
        .values(CreateVoucherRequestEntity {
            seller_id,
            code,
            discount_percent: body.discount_percent,
            min_order_amount: body.min_order_amount,
            status: RequestStatus::Pending.as_str().to_string(),
        })
        .returning(VoucherRequestEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create voucher request")?;

    Ok(StdResponse {
        data: Some(request),
        message: Some("Created voucher request"),
    })
}

#[utoipa::path(
    get,
    path = "/requests",
    tags = ["Vouchers"],
    responses(
        (status = 200, description = "List my voucher requests", body = StdResponse<Vec<VoucherRequestEntity>, String>)
    )
)]
async fn get_my_voucher_requests(
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let requests: Vec<VoucherRequestEntity> = voucher_requests::table
        .filter(voucher_requests::seller_id.eq(seller_id))
        .order_by(voucher_requests::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get voucher requests")?;

    Ok(StdResponse {
        data: Some(requests),
        message: Some("Get voucher requests successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Vouchers"],
    responses(
        (status = 200, description = "List my vouchers", body = StdResponse<Vec<VoucherEntity>, String>)
    )
)]
async fn get_my_vouchers(
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_vouchers: Vec<VoucherEntity> = vouchers::table
        .filter(vouchers::seller_id.eq(seller_id))
        .order_by(vouchers::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get vouchers")?;

    Ok(StdResponse {
        data: Some(my_vouchers),
        message: Some("Get vouchers successfully"),
    })
}
