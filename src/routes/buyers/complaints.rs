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
    models::{ComplaintEntity, CreateComplaintEntity, OrderEntity},
    schema::{complaints, orders},
    statuses::ComplaintStatus,
};

/// Defines buyer complaint routes (file + list own).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/buyers/complaints",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_complaint))
            .routes(utoipa_axum::routes!(get_my_complaints))
            .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreateComplaintReq {
    order_id: i32,
    subject: String,
    description: String,
}

/// File a complaint against one of the buyer's own orders.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Complaints"],
    request_body = CreateComplaintReq,
    responses(
        (status = 200, description = "Created complaint successfully", body = StdResponse<ComplaintEntity, String>)
    )
)]
async fn create_complaint(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<CreateComplaintReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.subject.trim().is_empty() || body.description.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Subject and description must not be empty".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let _order: OrderEntity = orders::table
        .find(body.order_id)
        .filter(orders::buyer_id.eq(buyer_id))
        .get_result(conn)
        .await?;

    let complaint: ComplaintEntity = diesel::insert_into(complaints::table)
        .values(CreateComplaintEntity {
            order_id: body.order_id,
            buyer_id,
            subject: body.subject.trim().to_string(),
            description: body.description.trim().to_string(),
            status: ComplaintStatus::Open.as_str().to_string(),
        })
        .returning(ComplaintEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create complaint")?;

    Ok(StdResponse {
        data: Some(complaint),
        message: Some("Created complaint successfully"),
    })
}

/// Fetch all complaints filed by the authenticated buyer.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Complaints"],
    responses(
        (status = 200, description = "List my complaints", body = StdResponse<Vec<ComplaintEntity>, String>)
    )
)]
async fn get_my_complaints(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_complaints: Vec<ComplaintEntity> = complaints::table
        .filter(complaints::buyer_id.eq(buyer_id))
        .order_by(complaints::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get complaints")?;

    Ok(StdResponse {
        data: Some(my_complaints),
        message: Some("Get complaints successfully"),
    })
}
