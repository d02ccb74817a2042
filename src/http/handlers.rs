use crate::error::{AppError, AppResult};
use crate::http::extract::{header_str, CurrentUser, WEBHOOK_SIGNATURE_HEADER};
use crate::models::{parse_stay_date, Booking, OrderHandle};
use crate::services::{PaymentConfirmation, StayRequest};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

fn default_guests() -> i32 {
    1
}

fn parse_date(field: &str, raw: &str) -> AppResult<chrono::DateTime<chrono::Utc>> {
    parse_stay_date(raw).map_err(|e| AppError::Validation(format!("{}: {}", field, e)))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(b)| b)
        .map_err(|e| AppError::Validation(e.body_text()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayBody {
    pub listing_id: Uuid,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_guests")]
    pub guests: i32,
}

impl StayBody {
    fn into_stay(self) -> AppResult<StayRequest> {
        Ok(StayRequest {
            listing_id: self.listing_id,
            start_date: parse_date("startDate", &self.start_date)?,
            end_date: parse_date("endDate", &self.end_date)?,
            guests: self.guests,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBody {
    #[serde(alias = "razorpay_order_id")]
    pub order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
    #[serde(flatten)]
    pub stay: StayBody,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(alias = "startDate")]
    pub start: String,
    #[serde(alias = "endDate")]
    pub end: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    payload: Result<Json<StayBody>, JsonRejection>,
) -> AppResult<Json<OrderHandle>> {
    let stay = body(payload)?.into_stay()?;
    let handle = state.orders.create_order(&stay, &requester).await?;
    Ok(Json(handle))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    payload: Result<Json<VerifyBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let req = body(payload)?;
    let confirmation = PaymentConfirmation {
        order_id: req.order_id,
        payment_id: req.payment_id,
        signature: req.signature,
    };
    let stay = req.stay.into_stay()?;

    let booking = state
        .verifier
        .verify(&confirmation, &stay, &requester)
        .await?;
    Ok(Json(json!({ "booking": booking })))
}

/// Provider callback; authenticated by signature over the raw body only
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw_body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = header_str(&headers, WEBHOOK_SIGNATURE_HEADER).unwrap_or("");
    state.webhooks.handle_webhook(&raw_body, signature).await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn my_bookings(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
) -> AppResult<Json<Vec<Booking>>> {
    Ok(Json(state.bookings.list_for_user(&requester).await?))
}

pub async fn all_bookings(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
) -> AppResult<Json<Vec<Booking>>> {
    Ok(Json(state.bookings.list_all(&requester).await?))
}

pub async fn listing_bookings(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(listing_id): Path<Uuid>,
) -> AppResult<Json<Vec<Booking>>> {
    Ok(Json(
        state
            .bookings
            .list_for_listing(listing_id, &requester)
            .await?,
    ))
}

pub async fn get_booking(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<Booking>> {
    Ok(Json(state.bookings.get(booking_id, &requester).await?))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let booking = state.bookings.cancel(booking_id, &requester).await?;
    Ok(Json(json!({ "message": "Booking cancelled", "booking": booking })))
}

pub async fn availability(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Value>> {
    let start = parse_date("start", &query.start)?;
    let end = parse_date("end", &query.end)?;
    let available = state
        .bookings
        .check_availability(listing_id, start, end)
        .await?;
    Ok(Json(json!({ "available": available })))
}
