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
    models::{AddressEntity, CreateAddressEntity},
    schema::addresses,
};

/// Defines buyer address-book routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/buyers/addresses",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_addresses))
            .routes(utoipa_axum::routes!(create_address))
            .routes(utoipa_axum::routes!(update_address))
            .routes(utoipa_axum::routes!(delete_address))
            .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
    )
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Addresses"],
    responses(
        (status = 200, description = "List my addresses", body = StdResponse<Vec<AddressEntity>, String>)
    )
)]
async fn get_my_addresses(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let my_addresses: Vec<AddressEntity> = addresses::table
        .filter(addresses::user_id.eq(buyer_id))
        .order_by((addresses::is_default.desc(), addresses::created_at.desc()))
        .get_results(conn)
        .await
        .context("Failed to get addresses")?;

    Ok(StdResponse {
        data: Some(my_addresses),
        message: Some("Get addresses successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct AddressReq {
    recipient: String,
    phone: String,
    line1: String,
    line2: Option<String>,
    city: String,
    postal_code: String,
    country: String,
    #[serde(default)]
    is_default: bool,
}

fn validate_address_req(body: &AddressReq) -> Result<(), AppError> {
    for (field, value) in [
        ("recipient", &body.recipient),
        ("line1", &body.line1),
        ("city", &body.city),
        ("postal_code", &body.postal_code),
        ("country", &body.country),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} must not be empty")));
        }
    }
    Ok(())
}

/// Create an address. Marking it as default clears the flag on every other
/// address of the buyer in the same transaction.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Addresses"],
    request_body = AddressReq,
    responses(
        (status = 200, description = "Created address successfully", body = StdResponse<AddressEntity, String>)
    )
)]
async fn create_address(
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<AddressReq>,
) -> Result<impl IntoResponse, AppError> {
    validate_address_req(&body)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let address = conn
        .transaction(move |conn| {
            Box::pin(async move {
                if body.is_default {
                    diesel::update(addresses::table.filter(addresses::user_id.eq(buyer_id)))
                        .set(addresses::is_default.eq(false))
                        .execute(conn)
                        .await
                        .context("Failed to clear default addresses")?;
                }

                let address: AddressEntity = diesel::insert_into(addresses::table)
                    .values(CreateAddressEntity {
                        user_id: buyer_id,
                        recipient: body.recipient,
                        phone: body.phone,
                        line1: body.line1,
                        line2: body.line2,
                        city: body.city,
                        postal_code: body.postal_code,
                        country: body.country,
                        is_default: body.is_default,
                    })
                    .returning(AddressEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create address")?;

                Ok::<AddressEntity, AppError>(address)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Created address successfully"),
    })
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Addresses"],
    params(
        ("id" = i32, Path, description = "Address ID to update")
    ),
    request_body = AddressReq,
    responses(
        (status = 200, description = "Updated address successfully", body = StdResponse<AddressEntity, String>)
    )
)]
async fn update_address(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
    Json(body): Json<AddressReq>,
) -> Result<impl IntoResponse, AppError> {
    validate_address_req(&body)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let address = conn
        .transaction(move |conn| {
            Box::pin(async move {
                if body.is_default {
                    diesel::update(addresses::table.filter(addresses::user_id.eq(buyer_id)))
                        .set(addresses::is_default.eq(false))
                        .execute(conn)
                        .await
                        .context("Failed to clear default addresses")?;
                }

                let address: AddressEntity = diesel::update(
                    addresses::table
                        .find(id)
                        .filter(addresses::user_id.eq(buyer_id)),
                )
                .set((
                    addresses::recipient.eq(body.recipient),
                    addresses::phone.eq(body.phone),
                    addresses::line1.eq(body.line1),
                    addresses::line2.eq(body.line2),
                    addresses::city.eq(body.city),
                    addresses::postal_code.eq(body.postal_code),
                    addresses::country.eq(body.country),
                    addresses::is_default.eq(body.is_default),
                    addresses::updated_at.eq(diesel::dsl::now),
                ))
                .returning(AddressEntity::as_returning())
                .get_result(conn)
                .await?;

                Ok::<AddressEntity, AppError>(address)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Updated address successfully"),
    })
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Addresses"],
    params(
        ("id" = i32, Path, description = "Address ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted address successfully", body = StdResponse<AddressEntity, String>)
    )
)]
async fn delete_address(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(buyer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let address: AddressEntity = diesel::delete(
        addresses::table
            .find(id)
            .filter(addresses::user_id.eq(buyer_id)),
    )
    .returning(AddressEntity::as_returning())
    .get_result(conn)
    .await?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Deleted address successfully"),
    })
}
