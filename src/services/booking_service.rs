use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, Requester};
use crate::repositories::{BookingStore, ListingStore};
use crate::services::audit::AuditTrailService;
use crate::services::availability::AvailabilityChecker;
use crate::services::pricing::nights_between;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Upper bound on the admin listing of all bookings
pub const MAX_ADMIN_LISTING: i64 = 500;

/// True when a non-privileged guest may still cancel a stay starting at `start`
pub fn within_cancellation_policy(start: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    start - now >= window
}

/// Booking reads and the cancellation lifecycle
pub struct BookingService {
    bookings: Arc<dyn BookingStore>,
    listings: Arc<dyn ListingStore>,
    availability: AvailabilityChecker,
    audit: Arc<AuditTrailService>,
    cancellation_window: Duration,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        listings: Arc<dyn ListingStore>,
        audit: Arc<AuditTrailService>,
        cancellation_window: Duration,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(bookings.clone()),
            bookings,
            listings,
            audit,
            cancellation_window,
        }
    }

    /// Cancel a booking.
    ///
    /// Owners may cancel until the policy window before check-in; admins at
    /// any time. Cancelling an already-cancelled booking returns it unchanged.
    pub async fn cancel(&self, booking_id: Uuid, requester: &Requester) -> AppResult<Booking> {
        self.cancel_at(booking_id, requester, Utc::now()).await
    }

    /// [`cancel`](Self::cancel) evaluated at an explicit instant
    pub async fn cancel_at(
        &self,
        booking_id: Uuid,
        requester: &Requester,
        now: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if !requester.is_privileged() && !booking.is_owned_by(requester.user_id) {
            warn!(
                "User {} attempted to cancel booking {} they do not own",
                requester.user_id, booking_id
            );
            return Err(AppError::Forbidden(
                "Not authorized to cancel this booking".to_string(),
            ));
        }

        if booking.is_cancelled() {
            return Ok(booking);
        }

        if !requester.is_privileged()
            && !within_cancellation_policy(booking.start_date, now, self.cancellation_window)
        {
            return Err(AppError::TooLate(format!(
                "Bookings cannot be cancelled less than {} hours before check-in",
                self.cancellation_window.num_hours()
            )));
        }

        let cancelled = self
            .bookings
            .transition_status(booking_id, BookingStatus::Cancelled)
            .await?;

        info!(
            "Booking {} cancelled by {} ({})",
            booking_id,
            requester.user_id,
            requester.role.as_str()
        );
        if let Err(e) = self.audit.log_booking_cancelled(&cancelled, requester).await {
            warn!("Failed to audit cancellation of {}: {}", booking_id, e);
        }

        Ok(cancelled)
    }

    /// Single booking, visible to its guest, the listing owner and admins
    pub async fn get(&self, booking_id: Uuid, requester: &Requester) -> AppResult<Booking> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if requester.is_privileged() || booking.is_owned_by(requester.user_id) {
            return Ok(booking);
        }

        let owns_listing = self
            .listings
            .find_by_id(booking.listing_id)
            .await?
            .map(|l| l.is_owned_by(requester.user_id))
            .unwrap_or(false);
        if owns_listing {
            Ok(booking)
        } else {
            Err(AppError::Forbidden("Not authorized to view this booking".to_string()))
        }
    }

    /// The requester's own bookings, newest first
    pub async fn list_for_user(&self, requester: &Requester) -> AppResult<Vec<Booking>> {
        Ok(self.bookings.find_by_user(requester.user_id).await?)
    }

    /// Every booking, newest first (admin only)
    pub async fn list_all(&self, requester: &Requester) -> AppResult<Vec<Booking>> {
        if !requester.is_privileged() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(self.bookings.find_all(MAX_ADMIN_LISTING).await?)
    }

    /// Bookings of one listing, for its owner or an admin
    pub async fn list_for_listing(
        &self,
        listing_id: Uuid,
        requester: &Requester,
    ) -> AppResult<Vec<Booking>> {
        let listing = self
            .listings
            .find_by_id(listing_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

        if !requester.is_privileged() && !listing.is_owned_by(requester.user_id) {
            return Err(AppError::Forbidden(
                "Not authorized to view bookings for this listing".to_string(),
            ));
        }

        Ok(self.bookings.find_by_listing(listing_id).await?)
    }

    /// Whether `[start, end)` is free on the listing
    pub async fn check_availability(
        &self,
        listing_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<bool> {
        nights_between(start, end)?;

        if self.listings.find_by_id(listing_id).await?.is_none() {
            return Err(AppError::NotFound("Listing not found".to_string()));
        }

        self.availability.is_available(listing_id, start, end).await
    }
}
