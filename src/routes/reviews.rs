use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    checkout::round2,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{CreateReviewEntity, OrderEntity, ReviewEntity},
    schema::{order_items, orders, reviews},
    statuses::OrderStatus,
};

/// Public review listing per product, plus buyer-submitted reviews.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    let public = OpenApiRouter::new().routes(utoipa_axum::routes!(get_product_reviews));

    let buyer = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_review))
        .route_layer(axum::middleware::from_fn(middleware::buyers_authorization));

    utoipa_axum::router::OpenApiRouter::new().nest("/reviews", public.merge(buyer))
}

#[derive(Serialize, ToSchema)]
struct ProductReviewsRes {
    pub reviews: Vec<ReviewEntity>,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// Fetch all reviews of a product with the average rating.
#[utoipa::path(
    get,
    path = "/product/{product_id}",
    tags = ["Reviews"],
    params(
        ("product_id" = i32, Path, description = "Product ID to list reviews for")
    ),
    responses(
        (status = 200, description = "List product reviews", body = StdResponse<ProductReviewsRes, String>)
    )
)]
async fn get_product_reviews(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product_reviews: Vec<ReviewEntity> = reviews::table
        .filter(reviews::product_id.eq(product_id))
        .order_by(reviews::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get reviews")?;

    let review_count = product_reviews.len() as i64;
    let average_rating = (!product_reviews.is_empty()).then(|| {
        round2(
            product_reviews.iter().map(|review| review.rating as f64).sum::<f64>()
                / product_reviews.len() as f64,
        )
    });

    Ok(StdResponse {
        data: Some(ProductReviewsRes {
            reviews: product_reviews,
            average_rating,
            review_count,
        }),
        message: Some("Get reviews successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateReviewReq {
    order_id: i32,
    product_id: i32,
    rating: i32,
    comment: Option<String>,
}

/// Review a product from one of the buyer's delivered orders. One review
/// per (order, product).
#[utoipa::path(
    post,
    path = "/",
    tags = ["Reviews"],
    request_body = CreateReviewReq,
    responses(
        (status = 200, description = "Created review successfully", body = StdResponse<ReviewEntity, String>)
    )
)]
async fn create_review(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<CreateReviewReq>,
) -> Result<impl IntoResponse, AppError> {
    if !(1..=5).contains(&body.rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table
        .find(body.order_id)
        .filter(orders::buyer_id.eq(buyer_id))
        .get_result(conn)
        .await?;

    if order.status.parse::<OrderStatus>()? != OrderStatus::Delivered {
        return Err(AppError::BadRequest(
            "Only delivered orders can be reviewed".to_string(),
        ));
    }

    let purchased: i64 = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .filter(order_items::product_id.eq(body.product_id))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check order items")?;
    if purchased == 0 {
        return Err(AppError::BadRequest(
            "Product is not part of this order".to_string(),
        ));
    }

    let existing: i64 = reviews::table
        .filter(reviews::order_id.eq(order.id))
        .filter(reviews::product_id.eq(body.product_id))
        .filter(reviews::buyer_id.eq(buyer_id))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check existing reviews")?;
    if existing > 0 {
        return Err(AppError::BadRequest(
            "Product already reviewed for this order".to_string(),
        ));
    }

    let review: ReviewEntity = diesel::insert_into(reviews::table)
        .values(CreateReviewEntity {
            order_id: order.id,
            product_id: body.product_id,
            buyer_id,
            rating: body.rating,
            comment: body.comment,
        })
        .returning(ReviewEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create review")?;

    Ok(StdResponse {
        data: Some(review),
        message: Some("Created review successfully"),
    })
}
