//! Payment provider shapes: orders we request and the webhook envelope the
//! provider delivers back.

use super::booking::parse_stay_date;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Event name the provider uses for a successfully captured payment
pub const PAYMENT_CAPTURED: &str = "payment.captured";

/// Booking parameters embedded in a provider order so that a webhook arriving
/// with no local state can still reconstruct the booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderNotes {
    pub listing_id: Uuid,
    pub user_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub guests: i32,
    pub subtotal: i64,
    pub platform_fee: i64,
}

impl OrderNotes {
    /// Provider notes are flat string key/value pairs
    pub fn to_map(&self) -> Map<String, Value> {
        let mut notes = Map::new();
        notes.insert("listingId".into(), Value::String(self.listing_id.to_string()));
        notes.insert("userId".into(), Value::String(self.user_id.to_string()));
        notes.insert(
            "startDate".into(),
            Value::String(self.start_date.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        notes.insert(
            "endDate".into(),
            Value::String(self.end_date.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        notes.insert("guests".into(), Value::String(self.guests.to_string()));
        notes.insert("subtotal".into(), Value::String(self.subtotal.to_string()));
        notes.insert("platformFee".into(), Value::String(self.platform_fee.to_string()));
        notes
    }

    /// Rebuild notes from a webhook payload.
    ///
    /// Returns the names of every field that is missing or malformed so the
    /// caller can report them; `subtotal`/`platformFee` are informational and
    /// default to zero because the price is always recomputed.
    pub fn from_value(notes: &Value) -> Result<Self, Vec<&'static str>> {
        let empty = Map::new();
        let map = notes.as_object().unwrap_or(&empty);
        let mut bad = Vec::new();

        let listing_id = note_str(map, "listingId").and_then(|s| Uuid::parse_str(&s).ok());
        if listing_id.is_none() {
            bad.push("listingId");
        }
        let user_id = note_str(map, "userId").and_then(|s| Uuid::parse_str(&s).ok());
        if user_id.is_none() {
            bad.push("userId");
        }
        let start_date = note_str(map, "startDate").and_then(|s| parse_stay_date(&s).ok());
        if start_date.is_none() {
            bad.push("startDate");
        }
        let end_date = note_str(map, "endDate").and_then(|s| parse_stay_date(&s).ok());
        if end_date.is_none() {
            bad.push("endDate");
        }
        let guests = note_i64(map, "guests")
            .and_then(|g| i32::try_from(g).ok())
            .filter(|g| *g > 0);
        if guests.is_none() {
            bad.push("guests");
        }

        match (listing_id, user_id, start_date, end_date, guests) {
            (Some(listing_id), Some(user_id), Some(start_date), Some(end_date), Some(guests)) => {
                Ok(Self {
                    listing_id,
                    user_id,
                    start_date,
                    end_date,
                    guests,
                    subtotal: note_i64(map, "subtotal").unwrap_or(0),
                    platform_fee: note_i64(map, "platformFee").unwrap_or(0),
                })
            }
            _ => Err(bad),
        }
    }
}

fn note_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn note_i64(map: &Map<String, Value>, key: &str) -> Option<i64> {
    match map.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Order creation request sent to the provider
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: OrderNotes,
}

/// Provider-side order. Never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    /// Notes attached at creation; `[]` when the order carried none
    #[serde(default)]
    pub notes: Value,
}

impl PaymentOrder {
    /// Booking parameters recorded on the order
    pub fn booking_notes(&self) -> Result<OrderNotes, Vec<&'static str>> {
        OrderNotes::from_value(&self.notes)
    }
}

/// What the client needs to complete payment with the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHandle {
    pub order_id: String,
    pub key_id: String,
    pub amount: i64,
    pub currency: String,
}

/// Provider webhook envelope
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<PaymentWrapper>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentWrapper {
    pub entity: PaymentEntity,
}

/// Payment object embedded in provider events
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Object of notes, or `[]` when the order carried none
    #[serde(default)]
    pub notes: Value,
}

impl WebhookEvent {
    pub fn is_payment_captured(&self) -> bool {
        self.event == PAYMENT_CAPTURED
    }

    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}
