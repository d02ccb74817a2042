//! Storage seams used by the booking services.
//!
//! Each trait has a PostgreSQL implementation and an in-memory one
//! (`repositories::memory`). Both must honour the same contract for
//! [`BookingStore::insert`]: the overlap check, the payment-reference
//! uniqueness check and the write happen as one atomic step.

use crate::error::RepositoryError;
use crate::models::{Booking, BookingStatus, Listing, NewBooking, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepositoryError>;

    async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Booking>, RepositoryError>;

    /// First pending/paid booking of `listing_id` overlapping `[start, end)`
    async fn find_active_overlap(
        &self,
        listing_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Booking>, RepositoryError>;

    /// Insert a booking.
    ///
    /// Fails with [`RepositoryError::Overlap`] when an active booking of the
    /// same listing overlaps the new one (only checked when the new booking is
    /// itself active), and with [`RepositoryError::Duplicate`] when the
    /// payment reference is already recorded.
    async fn insert(&self, booking: NewBooking) -> Result<Booking, RepositoryError>;

    /// Move a booking to `next` if [`BookingStatus::can_transition_to`] allows it.
    ///
    /// Re-applying the current status returns the booking untouched.
    /// Fails with `NotFound` when absent and `ConstraintViolation` when the
    /// move is not allowed.
    async fn transition_status(
        &self,
        id: Uuid,
        next: BookingStatus,
    ) -> Result<Booking, RepositoryError>;

    /// Bookings of one guest, newest first
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>, RepositoryError>;

    /// Bookings of one listing ordered by start date
    async fn find_by_listing(&self, listing_id: Uuid) -> Result<Vec<Booking>, RepositoryError>;

    /// All bookings, newest first
    async fn find_all(&self, limit: i64) -> Result<Vec<Booking>, RepositoryError>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>, RepositoryError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
}
