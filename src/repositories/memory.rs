//! In-memory stores.
//!
//! Used by the test suites and for running the service without a database.
//! The booking store keeps every record behind one mutex and never awaits
//! while holding it, so check-and-insert is atomic exactly like the
//! PostgreSQL constraints make it.

use crate::error::RepositoryError;
use crate::models::{Booking, BookingStatus, Listing, NewBooking, User};
use crate::repositories::store::{BookingStore, ListingStore, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Storage("in-memory store lock poisoned".to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingStore {
    bookings: Arc<Mutex<HashMap<Uuid, Booking>>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bookings, whatever their status
    pub fn len(&self) -> usize {
        self.bookings.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored booking
    pub fn snapshot(&self) -> Vec<Booking> {
        self.bookings
            .lock()
            .map(|b| b.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepositoryError> {
        Ok(lock(&self.bookings)?.get(&id).cloned())
    }

    async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Booking>, RepositoryError> {
        Ok(lock(&self.bookings)?
            .values()
            .find(|b| b.payment_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn find_active_overlap(
        &self,
        listing_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Booking>, RepositoryError> {
        Ok(lock(&self.bookings)?
            .values()
            .filter(|b| b.blocks(listing_id, start, end))
            .min_by_key(|b| b.start_date)
            .cloned())
    }

    async fn insert(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        if booking.start_date >= booking.end_date {
            return Err(RepositoryError::ConstraintViolation(
                "bookings_dates_ordered".to_string(),
            ));
        }
        if booking.guests <= 0 {
            return Err(RepositoryError::ConstraintViolation(
                "guests must be positive".to_string(),
            ));
        }
        if booking.total_price != booking.subtotal + booking.platform_fee {
            return Err(RepositoryError::ConstraintViolation(
                "bookings_total_consistent".to_string(),
            ));
        }

        let mut bookings = lock(&self.bookings)?;

        if let Some(reference) = booking.payment_reference.as_deref() {
            if bookings
                .values()
                .any(|b| b.payment_reference.as_deref() == Some(reference))
            {
                return Err(RepositoryError::Duplicate(
                    "bookings_payment_reference_key".to_string(),
                ));
            }
        }

        if booking.status.is_active()
            && bookings
                .values()
                .any(|b| b.blocks(booking.listing_id, booking.start_date, booking.end_date))
        {
            return Err(RepositoryError::Overlap("bookings_no_overlap".to_string()));
        }

        let record = booking.into_booking(Uuid::new_v4(), Utc::now());
        bookings.insert(record.id, record.clone());
        Ok(record)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        next: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        let mut bookings = lock(&self.bookings)?;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Booking {} not found", id)))?;

        if booking.status == next {
            return Ok(booking.clone());
        }
        if !booking.status.can_transition_to(next) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "Booking {} cannot move from {} to {}",
                id,
                booking.status.as_str(),
                next.as_str()
            )));
        }

        booking.status = next;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>, RepositoryError> {
        let mut found: Vec<Booking> = lock(&self.bookings)?
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_by_listing(&self, listing_id: Uuid) -> Result<Vec<Booking>, RepositoryError> {
        let mut found: Vec<Booking> = lock(&self.bookings)?
            .values()
            .filter(|b| b.listing_id == listing_id)
            .cloned()
            .collect();
        found.sort_by_key(|b| b.start_date);
        Ok(found)
    }

    async fn find_all(&self, limit: i64) -> Result<Vec<Booking>, RepositoryError> {
        let mut found: Vec<Booking> = lock(&self.bookings)?.values().cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(found)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryListingStore {
    listings: Arc<Mutex<HashMap<Uuid, Listing>>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        lock(&self.listings)?.insert(listing.id, listing.clone());
        Ok(listing)
    }

    /// Change the nightly rate of a stored listing
    pub fn set_price(&self, id: Uuid, price: i64) -> Result<(), RepositoryError> {
        let mut listings = lock(&self.listings)?;
        let listing = listings
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Listing {} not found", id)))?;
        listing.price = price;
        Ok(())
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>, RepositoryError> {
        Ok(lock(&self.listings)?.get(&id).cloned())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) -> Result<User, RepositoryError> {
        lock(&self.users)?.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }
}
