use anyhow::Context;
use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
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
    models::VoucherEntity,
    schema::vouchers,
};

pub const VOUCHER_STATUS_ACTIVE: &str = "active";

/// Voucher validation for buyers. Applying the discount stays decoupled
/// from checkout totals.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/vouchers",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(validate_voucher))
            .route_layer(axum::middleware::from_fn(middleware::buyers_authorization)),
    )
}

/// Check a voucher against an order amount: active, not expired, minimum
/// met. Returns the discount it would grant.
fn evaluate_voucher(
    voucher: &VoucherEntity,
    order_amount: f64,
    now: DateTime<Utc>,
) -> Result<f64, String> {
    if voucher.status != VOUCHER_STATUS_ACTIVE {
        return Err("Voucher is not active".to_string());
    }
    if let Some(expires_at) = voucher.expires_at {
        if expires_at <= now {
            return Err("Voucher has expired".to_string());
        }
    }
    if order_amount < voucher.min_order_amount {
        return Err(format!(
            "Order amount is below the {:.2} minimum",
            voucher.min_order_amount
        ));
    }

    Ok(round2(order_amount * voucher.discount_percent / 100.0))
}

#[derive(Deserialize, ToSchema)]
struct ValidateVoucherReq {
    code: String,
    seller_id: i32,
    order_amount: f64,
}

#[derive(Serialize, ToSchema)]
struct ValidateVoucherRes {
    pub valid: bool,
    pub discount_amount: Option<f64>,
    pub reason: Option<String>,
}

/// Validate a voucher code against a seller and an order amount. An
/// unusable voucher is a negative validation result, not an error.
#[utoipa::path(
    post,
    path = "/validate",
    tags = ["Vouchers"],
    request_body = ValidateVoucherReq,
    responses(
        (status = 200, description = "Voucher validation result", body = StdResponse<ValidateVoucherRes, String>)
    )
)]
async fn validate_voucher(
    State(state): State<AppState>,
    Extension(_buyer_id): Extension<i32>,
    Json(body): Json<ValidateVoucherReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let voucher: Option<VoucherEntity> = vouchers::table
        .filter(vouchers::seller_id.eq(body.seller_id))
        .filter(vouchers::code.eq(body.code.trim().to_uppercase()))
        .first(conn)
        .await
        .optional()
        .context("Failed to look up voucher")?;

    let result = match &voucher {
        None => ValidateVoucherRes {
            valid: false,
            discount_amount: None,
            reason: Some("Voucher not found".to_string()),
        },
        Some(voucher) => match evaluate_voucher(voucher, body.order_amount, Utc::now()) {
            Ok(discount_amount) => ValidateVoucherRes {
                valid: true,
                discount_amount: Some(discount_amount),
                reason: None,
            },
            Err(reason) => ValidateVoucherRes {
                valid: false,
                discount_amount: None,
                reason: Some(reason),
            },
        },
    };

    Ok(StdResponse {
        data: Some(result),
        message: Some("Voucher validated"),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn voucher(discount_percent: f64, min_order_amount: f64) -> VoucherEntity {
        let now = Utc::now();
        VoucherEntity {
            id: 1,
            seller_id: 5,
            code: "SAVE10".to_string(),
            discount_percent,
            min_order_amount,
            status: VOUCHER_STATUS_ACTIVE.to_string(),
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn grants_rounded_discount() {
        let discount = evaluate_voucher(&voucher(10.0, 0.0), 33.33, Utc::now()).unwrap();
        assert!((discount - 3.33).abs() < 1e-9);
    }

    #[test]
    fn expired_voucher_is_rejected() {
        let mut expired = voucher(10.0, 0.0);
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        assert_eq!(
            evaluate_voucher(&expired, 50.0, Utc::now()).unwrap_err(),
            "Voucher has expired"
        );
    }

    #[test]
    fn minimum_order_amount_is_enforced() {
        let err = evaluate_voucher(&voucher(10.0, 100.0), 99.99, Utc::now()).unwrap_err();
        assert!(err.contains("minimum"));
    }

    #[test]
    fn disabled_voucher_is_rejected() {
        let mut disabled = voucher(10.0, 0.0);
        disabled.status = "disabled".to_string();
        assert_eq!(
            evaluate_voucher(&disabled, 50.0, Utc::now()).unwrap_err(),
            "Voucher is not active"
        );
    }
}
