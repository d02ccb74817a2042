//! Turning a confirmed payment into exactly one paid booking.
//!
//! Shared by client verification and webhook reconciliation: whichever
//! arrives first creates the booking, the other finds it by payment
//! reference.

use crate::error::{AppError, AppResult, RepositoryError};
use crate::models::{Booking, BookingStatus, Listing, NewBooking, OrderNotes};
use crate::repositories::{BookingStore, ListingStore};
use crate::services::audit::AuditTrailService;
use crate::services::availability::AvailabilityChecker;
use crate::services::pricing::{price_stay, to_minor_units, PriceQuote};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Subtotal and fee the order was issued at, in whole currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderQuote {
    pub subtotal: i64,
    pub platform_fee: i64,
}

/// Stay parameters attached to a confirmed payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidStay {
    pub listing_id: Uuid,
    pub user_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub guests: i32,
    /// Price quoted on the provider order, when known
    pub quoted: Option<OrderQuote>,
    /// Amount the provider collected, in minor units, when known
    pub captured_amount: Option<i64>,
}

impl PaidStay {
    /// Stay described by a provider order's notes
    pub fn from_notes(notes: &OrderNotes, captured_amount: Option<i64>) -> Self {
        Self {
            listing_id: notes.listing_id,
            user_id: notes.user_id,
            start_date: notes.start_date,
            end_date: notes.end_date,
            guests: notes.guests,
            quoted: Some(OrderQuote {
                subtotal: notes.subtotal,
                platform_fee: notes.platform_fee,
            }),
            captured_amount,
        }
    }
}

/// Result of settling a payment
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// This call created the booking
    Created(Booking),
    /// A booking for the payment reference already existed
    AlreadySettled(Booking),
}

impl SettleOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            SettleOutcome::Created(b) | SettleOutcome::AlreadySettled(b) => b,
        }
    }

    pub fn into_booking(self) -> Booking {
        match self {
            SettleOutcome::Created(b) | SettleOutcome::AlreadySettled(b) => b,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SettleOutcome::Created(_))
    }
}

fn unavailable() -> AppError {
    AppError::Conflict("Listing is not available for the selected dates".to_string())
}

/// Price to record for a paid stay.
///
/// With no known collected amount the stay is priced at the listing's current
/// rate. Otherwise the order's own quote is used when it accounts for the
/// amount (the host may have changed the rate since), then the current rate;
/// an amount neither explains is rejected.
fn settlement_price(listing: &Listing, stay: &PaidStay) -> AppResult<PriceQuote> {
    let current = price_stay(listing.price, stay.start_date, stay.end_date)?;
    let Some(captured) = stay.captured_amount else {
        return Ok(current);
    };

    if let Some(quoted) = stay.quoted {
        let issued = PriceQuote::issued(current.nights, quoted.subtotal, quoted.platform_fee)?;
        if issued.total_minor_units()? == captured {
            if issued != current {
                info!(
                    "Listing {} repriced since the order: settling at quoted total {} (now {})",
                    listing.id, issued.total, current.total
                );
            }
            return Ok(issued);
        }
    }

    let expected = current.total_minor_units()?;
    if captured != expected {
        return Err(AppError::Validation(format!(
            "Captured amount {} does not match booking total {}",
            captured, expected
        )));
    }
    Ok(current)
}

/// Find-or-create of paid bookings keyed on payment reference
pub struct SettlementService {
    bookings: Arc<dyn BookingStore>,
    listings: Arc<dyn ListingStore>,
    availability: AvailabilityChecker,
    audit: Arc<AuditTrailService>,
}

impl SettlementService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        listings: Arc<dyn ListingStore>,
        audit: Arc<AuditTrailService>,
    ) -> Self {
        Self {
            availability: AvailabilityChecker::new(bookings.clone()),
            bookings,
            listings,
            audit,
        }
    }

    /// Settle `payment_reference` into a paid booking for `stay`.
    ///
    /// Existing bookings for the reference are returned (a pending one is
    /// promoted to paid) before any availability check, so a retry of an
    /// already-settled payment never reports a conflict with itself.
    pub async fn settle(
        &self,
        payment_reference: &str,
        stay: &PaidStay,
        source: &str,
    ) -> AppResult<SettleOutcome> {
        if let Some(existing) = self
            .bookings
            .find_by_payment_reference(payment_reference)
            .await?
        {
            info!(
                "Payment {} already settled as booking {}",
                payment_reference, existing.id
            );
            return self.already_settled(existing, stay).await;
        }

        if stay.guests <= 0 {
            return Err(AppError::Validation("Guests must be at least 1".to_string()));
        }

        let listing = self
            .listings
            .find_by_id(stay.listing_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

        let quote = settlement_price(&listing, stay)?;

        if !self
            .availability
            .is_available(stay.listing_id, stay.start_date, stay.end_date)
            .await?
        {
            return self
                .settled_concurrently(payment_reference, stay, unavailable())
                .await;
        }

        let new_booking = NewBooking {
            user_id: stay.user_id,
            listing_id: stay.listing_id,
            start_date: stay.start_date,
            end_date: stay.end_date,
            guests: stay.guests,
            subtotal: quote.subtotal,
            platform_fee: quote.platform_fee,
            total_price: quote.total,
            status: BookingStatus::Paid,
            payment_reference: Some(payment_reference.to_string()),
        };

        match self.bookings.insert(new_booking).await {
            Ok(booking) => {
                info!(
                    "Booking {} committed from {}: listing={}, payment={}, total={}",
                    booking.id, source, booking.listing_id, payment_reference, booking.total_price
                );
                if let Err(e) = self.audit.log_booking_committed(&booking, source).await {
                    warn!("Failed to audit booking {}: {}", booking.id, e);
                }
                Ok(SettleOutcome::Created(booking))
            }
            // Lost the race to the other confirmation path
            Err(RepositoryError::Duplicate(_)) => {
                let err = AppError::Storage(format!(
                    "Duplicate payment reference {} but no booking found",
                    payment_reference
                ));
                self.settled_concurrently(payment_reference, stay, err).await
            }
            Err(RepositoryError::Overlap(_)) => {
                self.settled_concurrently(payment_reference, stay, unavailable()).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The dates may be taken by this very payment, settled by the other
    /// confirmation path since the first lookup.
    async fn settled_concurrently(
        &self,
        payment_reference: &str,
        stay: &PaidStay,
        otherwise: AppError,
    ) -> AppResult<SettleOutcome> {
        match self
            .bookings
            .find_by_payment_reference(payment_reference)
            .await?
        {
            Some(existing) => self.already_settled(existing, stay).await,
            None => Err(otherwise),
        }
    }

    /// Return the booking already recorded for a payment.
    ///
    /// A collected amount that differs from the recorded total is refused so
    /// the caller can report it; the booking itself is left as it is.
    async fn already_settled(&self, existing: Booking, stay: &PaidStay) -> AppResult<SettleOutcome> {
        if let Some(captured) = stay.captured_amount {
            let recorded = to_minor_units(existing.total_price)?;
            if captured != recorded {
                error!(
                    "Booking {} records total {} but payment collected {}",
                    existing.id, recorded, captured
                );
                if let Err(e) = self
                    .audit
                    .log_amount_mismatch(&existing, captured, recorded)
                    .await
                {
                    warn!("Failed to audit amount mismatch on {}: {}", existing.id, e);
                }
                return Err(AppError::Validation(format!(
                    "Collected amount {} does not match booking {} total {}",
                    captured, existing.id, recorded
                )));
            }
        }

        let booking = match existing.status {
            BookingStatus::Pending => {
                self.bookings
                    .transition_status(existing.id, BookingStatus::Paid)
                    .await?
            }
            BookingStatus::Paid => existing,
            // A cancelled booking stays cancelled
            BookingStatus::Cancelled => {
                warn!(
                    "Payment confirmation for cancelled booking {} ignored",
                    existing.id
                );
                existing
            }
        };
        Ok(SettleOutcome::AlreadySettled(booking))
    }
}
