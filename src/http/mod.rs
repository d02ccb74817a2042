//! HTTP boundary: translates requests into service calls and errors into
//! `{ "error", "detail" }` bodies.

mod error;
pub mod extract;
pub mod handlers;

use crate::AppState;
use axum::extract::MatchedPath;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use extract::{CurrentUser, INTERNAL_SECRET_HEADER, USER_ID_HEADER, WEBHOOK_SIGNATURE_HEADER};

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/bookings", get(handlers::all_bookings))
        .route("/bookings/orders", post(handlers::create_order))
        .route("/bookings/verify", post(handlers::verify_payment))
        .route("/bookings/webhook", post(handlers::payment_webhook))
        .route("/bookings/mine", get(handlers::my_bookings))
        .route("/bookings/listing/:listing_id", get(handlers::listing_bookings))
        .route("/bookings/availability/:listing_id", get(handlers::availability))
        .route(
            "/bookings/:id",
            get(handlers::get_booking).delete(handlers::cancel_booking),
        )
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(state)
        // Log the route template, never the query string
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str)
                    .unwrap_or_else(|| req.uri().path());
                tracing::span!(
                    tracing::Level::INFO,
                    "http_request",
                    method = %req.method(),
                    path = %path
                )
            }),
        )
}
