use anyhow::Context;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    models::CategoryEntity,
    schema::categories,
};

/// Public category browsing; management lives under the admin routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/categories",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_categories))
            .routes(utoipa_axum::routes!(get_category)),
    )
}

/// List all categories ordered by name.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Categories"],
    responses(
        (status = 200, description = "List categories", body = StdResponse<Vec<CategoryEntity>, String>)
    )
)]
async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let categories: Vec<CategoryEntity> = categories::table
        .order_by(categories::name.asc())
        .get_results(conn)
        .await
        .context("Failed to get categories")?;

    Ok(StdResponse {
        data: Some(categories),
        message: Some("Get categories successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Categories"],
    params(
        ("id" = i32, Path, description = "Category ID to fetch")
    ),
    responses(
        (status = 200, description = "Get category successfully", body = StdResponse<CategoryEntity, String>)
    )
)]
async fn get_category(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let category: CategoryEntity = categories::table.find(id).get_result(conn).await?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Get category successfully"),
    })
}
