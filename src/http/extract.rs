use crate::auth;
use crate::error::AppError;
use crate::models::Requester;
use crate::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// Header carrying the id of the user the upstream gateway authenticated
pub const USER_ID_HEADER: &str = "x-user-id";
/// Shared secret proving the request came through the upstream gateway
pub const INTERNAL_SECRET_HEADER: &str = "x-internal-secret";
/// Provider webhook signature header
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Authenticated caller of a route
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Requester);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(secret) = state.internal_auth_secret.as_deref() {
            let provided = header_str(&parts.headers, INTERNAL_SECRET_HEADER).unwrap_or("");
            if !auth::constant_time_eq(secret, provided) {
                return Err(AppError::Unauthorized("Invalid internal secret".to_string()));
            }
        }

        let user_id = header_str(&parts.headers, USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let requester = auth::resolve_requester(state.users.as_ref(), user_id).await?;
        Ok(CurrentUser(requester))
    }
}
