use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::ComplaintEntity,
    schema::{complaints, orders},
    statuses::{ComplaintStatus, ensure_complaint_transition},
};

/// Defines seller complaint routes: review and resolve complaints filed
/// against the seller's orders.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/sellers/complaints",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_complaints))
            .routes(utoipa_axum::routes!(update_complaint_status))
            .route_layer(axum::middleware::from_fn(middleware::sellers_authorization)),
    )
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Complaints"],
    responses(
        (status = 200, description = "List complaints against my orders", body = StdResponse<Vec<ComplaintEntity>, String>)
    )
)]
async fn get_my_complaints(
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_complaints: Vec<ComplaintEntity> = complaints::table
        .inner_join(orders::table)
        .filter(orders::seller_id.eq(seller_id))
        .order_by(complaints::created_at.desc())
        .select(ComplaintEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get complaints")?;

    Ok(StdResponse {
        data: Some(my_complaints),
        message: Some("Get complaints successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateComplaintStatusReq {
    status: ComplaintStatus,
}

/// Move a complaint through its lifecycle (open, in review, resolved or
/// rejected); illegal transitions are rejected.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Complaints"],
    params(
        ("id" = i32, Path, description = "Complaint ID to update")
    ),
    request_body = UpdateComplaintStatusReq,
    responses(
        (status = 200, description = "Updated complaint status", body = StdResponse<ComplaintEntity, String>),
        (status = 400, description = "Illegal status transition")
    )
)]
async fn update_complaint_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
    Json(body): Json<UpdateComplaintStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated_complaint = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let complaint: ComplaintEntity = complaints::table
                    .inner_join(orders::table)
                    .filter(complaints::id.eq(id))
                    .filter(orders::seller_id.eq(seller_id))
                    .select(ComplaintEntity::as_select())
                    .first(conn)
                    .await?;

                ensure_complaint_transition(&complaint.status, body.status)?;

                let updated_complaint: ComplaintEntity =
                    diesel::update(complaints::table.find(complaint.id))
                        .set((
                            complaints::status.eq(body.status.as_str()),
                            complaints::updated_at.eq(diesel::dsl::now),
                        ))
                        .returning(ComplaintEntity::as_returning())
                        .get_result(conn)
                        .await
                        .context("Failed to update complaint")?;

                Ok::<ComplaintEntity, AppError>(updated_complaint)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(updated_complaint),
        message: Some("Updated complaint status"),
    })
}
