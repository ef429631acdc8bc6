use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
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
    models::{CategoryEntity, CreateCategoryEntity},
    schema::categories,
};

/// Admin category management.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/categories",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_category))
            .routes(utoipa_axum::routes!(update_category))
            .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
    )
}

fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

#[derive(Deserialize, ToSchema)]
struct CategoryReq {
    name: String,
    parent_id: Option<i32>,
}

/// Create a category; the slug is derived from the name.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    request_body = CategoryReq,
    responses(
        (status = 200, description = "Created category successfully", body = StdResponse<CategoryEntity, String>)
    )
)]
async fn create_category(
    State(state): State<AppState>,
    Extension(_admin_id): Extension<i32>,
    Json(body): Json<CategoryReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Category name must not be empty".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let slug = slugify(&body.name);
    let existing: i64 = categories::table
        .filter(categories::slug.eq(&slug))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check category slug")?;
    if existing > 0 {
        return Err(AppError::BadRequest(format!(
            "Category {slug} already exists"
        )));
    }

    let category: CategoryEntity = diesel::insert_into(categories::table)
        .values(CreateCategoryEntity {
            name: body.name.trim().to_string(),
            slug,
            parent_id: body.parent_id,
        })
        .returning(CategoryEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create category")?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Created category successfully"),
    })
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    params(
        ("id" = i32, Path, description = "Category ID to update")
    ),
    request_body = CategoryReq,
    responses(
        (status = 200, description = "Updated category successfully", body = StdResponse<CategoryEntity, String>)
    )
)]
async fn update_category(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(_admin_id): Extension<i32>,
    Json(body): Json<CategoryReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Category name must not be empty".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let category: CategoryEntity = diesel::update(categories::table.find(id))
        .set((
            categories::name.eq(body.name.trim()),
            categories::slug.eq(slugify(&body.name)),
            categories::parent_id.eq(body.parent_id),
        ))
        .returning(CategoryEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Updated category successfully"),
    })
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slug_is_lowercase_and_dashed() {
        assert_eq!(slugify("Home Appliances"), "home-appliances");
        assert_eq!(slugify("  Books  "), "books");
    }
}
