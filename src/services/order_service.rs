use crate::error::{AppError, AppResult};
use crate::models::{OrderHandle, OrderNotes, OrderRequest, Requester};
use crate::repositories::{BookingStore, ListingStore};
use crate::services::availability::AvailabilityChecker;
use crate::services::payment_gateway::PaymentGateway;
use crate::services::pricing::price_stay;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Stay a guest wants to pay for
#[derive(Debug, Clone)]
pub struct StayRequest {
    pub listing_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub guests: i32,
}

/// Issues provider payment orders for available stays.
///
/// No booking is written here: the dates stay free until a payment is
/// confirmed, so an abandoned checkout never blocks a listing.
pub struct PaymentOrderService {
    listings: Arc<dyn ListingStore>,
    availability: AvailabilityChecker,
    gateway: Arc<dyn PaymentGateway>,
    key_id: String,
    currency: String,
}

impl PaymentOrderService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        listings: Arc<dyn ListingStore>,
        gateway: Arc<dyn PaymentGateway>,
        key_id: String,
        currency: String,
    ) -> Self {
        Self {
            listings,
            availability: AvailabilityChecker::new(bookings),
            gateway,
            key_id,
            currency,
        }
    }

    /// Price the stay, confirm it is free and open a provider order whose
    /// notes carry everything needed to rebuild the booking later.
    pub async fn create_order(
        &self,
        request: &StayRequest,
        requester: &Requester,
    ) -> AppResult<OrderHandle> {
        info!(
            "Creating payment order: listing={}, user={}, {} - {}",
            request.listing_id, requester.user_id, request.start_date, request.end_date
        );

        if request.guests <= 0 {
            return Err(AppError::Validation("Guests must be at least 1".to_string()));
        }

        let listing = self
            .listings
            .find_by_id(request.listing_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Listing not found".to_string()))?;

        let quote = price_stay(listing.price, request.start_date, request.end_date)?;

        if !self
            .availability
            .is_available(request.listing_id, request.start_date, request.end_date)
            .await?
        {
            return Err(AppError::Conflict(
                "Listing is not available for the selected dates".to_string(),
            ));
        }

        let order_request = OrderRequest {
            amount: quote.total_minor_units()?,
            currency: self.currency.clone(),
            receipt: format!("receipt_{}", Utc::now().timestamp_millis()),
            notes: OrderNotes {
                listing_id: request.listing_id,
                user_id: requester.user_id,
                start_date: request.start_date,
                end_date: request.end_date,
                guests: request.guests,
                subtotal: quote.subtotal,
                platform_fee: quote.platform_fee,
            },
        };

        let order = self.gateway.create_order(&order_request).await?;

        info!(
            "Payment order {} issued for listing {} ({} nights, total {})",
            order.id, request.listing_id, quote.nights, quote.total
        );

        Ok(OrderHandle {
            order_id: order.id,
            key_id: self.key_id.clone(),
            amount: order.amount,
            currency: order.currency,
        })
    }
}
