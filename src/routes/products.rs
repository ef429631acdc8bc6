use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, PgTextExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    checkout::PRODUCT_STATUS_ACTIVE,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    models::{ProductEntity, ProductVariantEntity},
    schema::{product_variants, products},
};

/// Public catalog routes; no authorization required.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_products))
            .routes(utoipa_axum::routes!(get_product)),
    )
}

#[derive(Deserialize, IntoParams)]
struct ListProductsParams {
    page: Option<u32>,
    per_page: Option<u32>,
    search: Option<String>,
    category_id: Option<i32>,
}

#[derive(Serialize, ToSchema)]
struct ProductPage {
    items: Vec<ProductEntity>,
    total: i64,
    page: u32,
    per_page: u32,
}

/// List active products, newest first, with optional title search and
/// category filter.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    params(ListProductsParams),
    responses(
        (status = 200, description = "List products", body = StdResponse<ProductPage, String>)
    )
)]
async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsParams>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);

    let mut query = products::table
        .filter(products::status.eq(PRODUCT_STATUS_ACTIVE))
        .into_boxed();
    let mut count_query = products::table
        .filter(products::status.eq(PRODUCT_STATUS_ACTIVE))
        .into_boxed();

    if let Some(search) = &params.search {
        let pattern = format!("%{search}%");
        query = query.filter(products::title.ilike(pattern.clone()));
        count_query = count_query.filter(products::title.ilike(pattern));
    }
    if let Some(category_id) = params.category_id {
        query = query.filter(products::category_id.eq(category_id));
        count_query = count_query.filter(products::category_id.eq(category_id));
    }

    let items: Vec<ProductEntity> = query
        .order_by(products::created_at.desc())
        .limit(per_page as i64)
        .offset(((page - 1) * per_page) as i64)
        .get_results(conn)
        .await
        .context("Failed to list products")?;

    let total: i64 = count_query
        .count()
        .get_result(conn)
        .await
        .context("Failed to count products")?;

    Ok(StdResponse {
        data: Some(ProductPage {
            items,
            total,
            page,
            per_page,
        }),
        message: Some("Get products successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct GetProductRes {
    product: ProductEntity,
    variants: Vec<ProductVariantEntity>,
}

/// Fetch a single active product with its variant combinations.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = i32, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<GetProductRes, String>)
    )
)]
async fn get_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = products::table
        .find(id)
        .filter(products::status.eq(PRODUCT_STATUS_ACTIVE))
        .get_result(conn)
        .await?;

    let variants: Vec<ProductVariantEntity> = product_variants::table
        .filter(product_variants::product_id.eq(product.id))
        .order_by(product_variants::variant_key.asc())
        .get_results(conn)
        .await
        .context("Failed to get product variants")?;

    Ok(StdResponse {
        data: Some(GetProductRes { product, variants }),
        message: Some("Get product successfully"),
    })
}
