use crate::error::AppResult;
use crate::repositories::BookingStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Answers whether a listing is free over a half-open range.
///
/// Only pending and paid bookings block; cancelled ones never do. The answer
/// is advisory: the store's insert re-checks atomically.
#[derive(Clone)]
pub struct AvailabilityChecker {
    bookings: Arc<dyn BookingStore>,
}

impl AvailabilityChecker {
    pub fn new(bookings: Arc<dyn BookingStore>) -> Self {
        Self { bookings }
    }

    pub async fn is_available(
        &self,
        listing_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<bool> {
        let blocking = self
            .bookings
            .find_active_overlap(listing_id, start, end)
            .await?;

        if let Some(existing) = &blocking {
            debug!(
                "Listing {} blocked by booking {} ({} - {})",
                listing_id, existing.id, existing.start_date, existing.end_date
            );
        }

        Ok(blocking.is_none())
    }
}
