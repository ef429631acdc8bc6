use axum::{extract::Request, middleware::Next, response::Response};

use crate::core::app_error::AppError;

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

/// Authentication itself happens at the gateway; this service trusts the
/// identity headers it forwards and only enforces the role split.
fn authenticated_id(req: &Request, required_role: &str) -> Result<i32, AppError> {
    let role = req
        .headers()
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if role != required_role {
        return Err(AppError::ForbiddenResource(format!(
            "{required_role} role required"
        )));
    }

    req.headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or(AppError::Unauthorized)
}

pub async fn buyers_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let buyer_id = authenticated_id(&req, "buyer")?;
    req.extensions_mut().insert(buyer_id);
    Ok(next.run(req).await)
}

pub async fn sellers_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let seller_id = authenticated_id(&req, "seller")?;
    req.extensions_mut().insert(seller_id);
    Ok(next.run(req).await)
}

pub async fn admins_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let admin_id = authenticated_id(&req, "admin")?;
    req.extensions_mut().insert(admin_id);
    Ok(next.run(req).await)
}
