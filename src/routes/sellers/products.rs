use std::collections::{BTreeMap, HashSet};

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
    checkout::{PRODUCT_STATUS_ACTIVE, PRODUCT_STATUS_ARCHIVED, variant_key_from_options},
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{
        CreateProductEntity, CreateProductVariantEntity, ProductEntity, ProductVariantEntity,
    },
    schema::{product_variants, products},
};

/// Defines seller product-management routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/sellers/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_products))
            .routes(utoipa_axum::routes!(create_product))
            .routes(utoipa_axum::routes!(get_my_product))
            .routes(utoipa_axum::routes!(update_product))
            .routes(utoipa_axum::routes!(archive_product))
            .route_layer(axum::middleware::from_fn(middleware::sellers_authorization)),
    )
}

#[derive(Deserialize, Clone, ToSchema)]
struct VariantReq {
    /// Option name/value pairs, e.g. `{"color": "red", "size": "m"}`.
    options: BTreeMap<String, String>,
    price: f64,
    quantity: i32,
}

#[derive(Deserialize, ToSchema)]
struct ProductReq {
    title: String,
    description: Option<String>,
    category_id: Option<i32>,
    price: f64,
    /// Flat stock; ignored when variants are supplied, in which case the
    /// product stock is the sum of its variants.
    stock: Option<i32>,
    #[serde(default)]
    variants: Vec<VariantReq>,
}

#[derive(Serialize, ToSchema)]
struct ProductRes {
    product: ProductEntity,
    variants: Vec<ProductVariantEntity>,
}

/// Resolve the derived variant keys, rejecting malformed or duplicate
/// combinations.
fn resolve_variants(body: &ProductReq) -> Result<Vec<(String, f64, i32)>, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title must not be empty".to_string()));
    }
    if body.price < 0.0 {
        return Err(AppError::BadRequest("Price must not be negative".to_string()));
    }
    if body.stock.is_some_and(|stock| stock < 0) {
        return Err(AppError::BadRequest("Stock must not be negative".to_string()));
    }

    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(body.variants.len());
    for variant in &body.variants {
        if variant.options.is_empty() {
            return Err(AppError::BadRequest(
                "Variant options must not be empty".to_string(),
            ));
        }
        if variant.price < 0.0 || variant.quantity < 0 {
            return Err(AppError::BadRequest(
                "Variant price and quantity must not be negative".to_string(),
            ));
        }
        let key = variant_key_from_options(&variant.options);
        if !seen.insert(key.clone()) {
            return Err(AppError::BadRequest(format!(
                "Duplicate variant combination {key}"
            )));
        }
        resolved.push((key, variant.price, variant.quantity));
    }

    Ok(resolved)
}

fn aggregate_stock(body: &ProductReq, resolved: &[(String, f64, i32)]) -> i32 {
    if resolved.is_empty() {
        body.stock.unwrap_or(0)
    } else {
        resolved.iter().map(|(_, _, quantity)| quantity).sum()
    }
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Seller products"],
    responses(
        (status = 200, description = "List my products", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_my_products(
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_products: Vec<ProductEntity> = products::table
        .filter(products::seller_id.eq(seller_id))
        .order_by(products::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my products")?;

    Ok(StdResponse {
        data: Some(my_products),
        message: Some("Get my products successfully"),
    })
}

/// Create a listing, flat or with variant combinations.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Seller products"],
    request_body = ProductReq,
    responses(
        (status = 200, description = "Created product successfully", body = StdResponse<ProductRes, String>)
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
    Json(body): Json<ProductReq>,
) -> Result<impl IntoResponse, AppError> {
    let resolved = resolve_variants(&body)?;
    let stock = aggregate_stock(&body, &resolved);

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (product, variants) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let product: ProductEntity = diesel::insert_into(products::table)
                    .values(CreateProductEntity {
                        seller_id,
                        category_id: body.category_id,
                        title: body.title.trim().to_string(),
                        description: body.description.clone(),
                        price: body.price,
                        stock,
                        status: PRODUCT_STATUS_ACTIVE.to_string(),
                    })
                    .returning(ProductEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create product")?;

                let variant_rows: Vec<CreateProductVariantEntity> = resolved
                    .into_iter()
                    .map(|(variant_key, price, quantity)| CreateProductVariantEntity {
                        product_id: product.id,
                        variant_key,
                        price,
                        quantity,
                    })
                    .collect();

                let variants = diesel::insert_into(product_variants::table)
                    .values(variant_rows)
                    .returning(ProductVariantEntity::as_returning())
                    .get_results(conn)
                    .await
                    .context("Failed to create product variants")?;

                Ok::<(ProductEntity, Vec<ProductVariantEntity>), AppError>((product, variants))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(ProductRes { product, variants }),
        message: Some("Created product successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Seller products"],
    params(
        ("id" = i32, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<ProductRes, String>)
    )
)]
async fn get_my_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = products::table
        .find(id)
        .filter(products::seller_id.eq(seller_id))
        .get_result(conn)
        .await?;

    let variants: Vec<ProductVariantEntity> = product_variants::table
        .filter(product_variants::product_id.eq(product.id))
        .order_by(product_variants::variant_key.asc())
        .get_results(conn)
        .await
        .context("Failed to get product variants")?;

    Ok(StdResponse {
        data: Some(ProductRes { product, variants }),
        message: Some("Get product successfully"),
    })
}

/// Update a listing. Variant combinations are replaced wholesale and the
/// aggregate stock recomputed.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Seller products"],
    params(
        ("id" = i32, Path, description = "Product ID to update")
    ),
    request_body = ProductReq,
    responses(
        (status = 200, description = "Updated product successfully", body = StdResponse<ProductRes, String>)
    )
)]
async fn update_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
    Json(body): Json<ProductReq>,
) -> Result<impl IntoResponse, AppError> {
    let resolved = resolve_variants(&body)?;
    let stock = aggregate_stock(&body, &resolved);

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (product, variants) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let product: ProductEntity = diesel::update(
                    products::table
                        .find(id)
                        .filter(products::seller_id.eq(seller_id)),
                )
                .set((
                    products::category_id.eq(body.category_id),
                    products::title.eq(body.title.trim()),
                    products::description.eq(body.description.clone()),
                    products::price.eq(body.price),
                    products::stock.eq(stock),
                    products::updated_at.eq(diesel::dsl::now),
                ))
                .returning(ProductEntity::as_returning())
                .get_result(conn)
                .await?;

                diesel::delete(
                    product_variants::table.filter(product_variants::product_id.eq(product.id)),
                )
                .execute(conn)
                .await
                .context("Failed to delete product variants")?;

                let variant_rows: Vec<CreateProductVariantEntity> = resolved
                    .into_iter()
                    .map(|(variant_key, price, quantity)| CreateProductVariantEntity {
                        product_id: product.id,
                        variant_key,
                        price,
                        quantity,
                    })
                    .collect();

                let variants = diesel::insert_into(product_variants::table)
                    .values(variant_rows)
                    .returning(ProductVariantEntity::as_returning())
                    .get_results(conn)
                    .await
                    .context("Failed to create product variants")?;

                Ok::<(ProductEntity, Vec<ProductVariantEntity>), AppError>((product, variants))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(ProductRes { product, variants }),
        message: Some("Updated product successfully"),
    })
}

/// Archive a listing; archived products disappear from the public catalog
/// and from checkout.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Seller products"],
    params(
        ("id" = i32, Path, description = "Product ID to archive")
    ),
    responses(
        (status = 200, description = "Archived product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn archive_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(seller_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::update(
        products::table
            .find(id)
            .filter(products::seller_id.eq(seller_id)),
    )
    .set((
        products::status.eq(PRODUCT_STATUS_ARCHIVED),
        products::updated_at.eq(diesel::dsl::now),
    ))
    .returning(ProductEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Archived product successfully"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(variants: Vec<VariantReq>) -> ProductReq {
        ProductReq {
            title: "Shirt".to_string(),
            description: None,
            category_id: None,
            price: 10.0,
            stock: Some(3),
            variants,
        }
    }

    fn variant(pairs: &[(&str, &str)], price: f64, quantity: i32) -> VariantReq {
        VariantReq {
            options: pairs
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            price,
            quantity,
        }
    }

    #[test]
    fn duplicate_variant_combinations_are_rejected() {
        let body = req(vec![
            variant(&[("size", "m"), ("color", "red")], 10.0, 1),
            variant(&[("color", "red"), ("size", "m")], 12.0, 2),
        ]);
        assert!(resolve_variants(&body).is_err());
    }

    #[test]
    fn variant_stock_overrides_flat_stock() {
        let body = req(vec![
            variant(&[("size", "m")], 10.0, 2),
            variant(&[("size", "l")], 10.0, 5),
        ]);
        let resolved = resolve_variants(&body).unwrap();
        assert_eq!(aggregate_stock(&body, &resolved), 7);
    }

    #[test]
    fn flat_product_uses_flat_stock() {
        let body = req(Vec::new());
        let resolved = resolve_variants(&body).unwrap();
        assert_eq!(aggregate_stock(&body, &resolved), 3);
    }
}
