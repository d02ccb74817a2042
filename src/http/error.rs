use crate::error::AppError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let detail = if self.is_client_error() {
            self.to_string()
        } else if matches!(self, AppError::ExternalService(_)) {
            error!("Payment provider failure: {}", self);
            "Payment provider unavailable".to_string()
        } else {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        };

        let body = Json(ErrorBody {
            error: self.kind(),
            detail,
        });
        (status, body).into_response()
    }
}
