use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Rental listing as seen by the booking service
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub location: Option<String>,
    /// Nightly rate in whole currency units
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn new(owner_id: Uuid, title: String, location: Option<String>, price: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title,
            location,
            price,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}
