use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::checkout::UnavailableItem;
use crate::core::aliases::DieselError;

/// Response envelope shared by every route.
#[derive(Serialize, ToSchema)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("resource not found")]
    NotFound,
    #[error("missing or invalid identity")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    ForbiddenResource(String),
    #[error("order cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("stock is no longer sufficient for {} item(s)", .0.len())]
    StockConflict(Vec<UnavailableItem>),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "data": null, "message": "Resource not found" }),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "data": null, "message": "Missing or invalid identity" }),
            ),
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "data": null, "message": message }),
            ),
            AppError::ForbiddenResource(message) => (
                StatusCode::FORBIDDEN,
                json!({ "data": null, "message": message }),
            ),
            AppError::InvalidTransition { from, to } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "data": null,
                    "message": format!("Order cannot move from {from} to {to}"),
                }),
            ),
            AppError::StockConflict(items) => (
                StatusCode::CONFLICT,
                json!({
                    "data": { "out_of_stock_items": items },
                    "message": "Stock changed before payment",
                }),
            ),
            AppError::Other(err) => {
                // The cause stays in the logs; clients get a generic body.
                tracing::error!("Unhandled error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "data": null, "message": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
