use crate::auth;
use crate::error::{AppError, AppResult};
use crate::models::{Booking, OrderNotes, Requester};
use crate::services::order_service::StayRequest;
use crate::services::payment_gateway::PaymentGateway;
use crate::services::settlement::{PaidStay, SettlementService};
use std::sync::Arc;
use tracing::{info, warn};

/// Checkout result the client forwards after paying
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Notes keep whole seconds, so compare instants at that precision
fn same_stay(notes: &OrderNotes, stay: &StayRequest) -> bool {
    notes.listing_id == stay.listing_id
        && notes.start_date.timestamp() == stay.start_date.timestamp()
        && notes.end_date.timestamp() == stay.end_date.timestamp()
        && notes.guests == stay.guests
}

/// Confirms client-reported payments and settles them into bookings
pub struct PaymentVerificationService {
    settlement: Arc<SettlementService>,
    gateway: Arc<dyn PaymentGateway>,
    key_secret: String,
}

impl PaymentVerificationService {
    pub fn new(
        settlement: Arc<SettlementService>,
        gateway: Arc<dyn PaymentGateway>,
        key_secret: String,
    ) -> Self {
        Self {
            settlement,
            gateway,
            key_secret,
        }
    }

    /// Verify the checkout signature, then settle the payment.
    ///
    /// The signature only covers `order|payment`, so the stay is read back
    /// from the paid order and the submitted one must match it; the booking
    /// is priced at what that order charged. Nothing is read or written
    /// before the signature checks out. Repeating a successful verification
    /// returns the same booking.
    pub async fn verify(
        &self,
        confirmation: &PaymentConfirmation,
        stay: &StayRequest,
        requester: &Requester,
    ) -> AppResult<Booking> {
        if let Err(e) = auth::verify_payment_signature(
            &self.key_secret,
            &confirmation.order_id,
            &confirmation.payment_id,
            &confirmation.signature,
        ) {
            warn!(
                "Rejected payment verification: order={}, payment={}, user={}",
                confirmation.order_id, confirmation.payment_id, requester.user_id
            );
            return Err(e);
        }

        let order = self.gateway.fetch_order(&confirmation.order_id).await?;
        let notes = order.booking_notes().map_err(|missing| {
            warn!(
                "Order {} carries no usable booking details: {:?}",
                order.id, missing
            );
            AppError::Validation(format!(
                "Payment order {} does not describe a stay",
                order.id
            ))
        })?;

        if notes.user_id != requester.user_id {
            warn!(
                "User {} tried to verify order {} of user {}",
                requester.user_id, order.id, notes.user_id
            );
            return Err(AppError::Forbidden(
                "Payment belongs to another user".to_string(),
            ));
        }

        if !same_stay(&notes, stay) {
            warn!(
                "Verification for order {} names a different stay: listing={}, {} - {}, guests={}",
                order.id, stay.listing_id, stay.start_date, stay.end_date, stay.guests
            );
            return Err(AppError::Validation(
                "Stay does not match the paid order".to_string(),
            ));
        }

        let paid = PaidStay::from_notes(&notes, Some(order.amount));
        let outcome = self
            .settlement
            .settle(&confirmation.payment_id, &paid, "client_verification")
            .await?;

        // Payment references are unique per booking; never hand one user's booking to another
        if !outcome.booking().is_owned_by(requester.user_id) {
            warn!(
                "Payment {} belongs to booking {} of another user",
                confirmation.payment_id,
                outcome.booking().id
            );
            return Err(AppError::Forbidden(
                "Payment belongs to another user".to_string(),
            ));
        }

        info!(
            "Payment {} verified for user {} (booking {}, created={})",
            confirmation.payment_id,
            requester.user_id,
            outcome.booking().id,
            outcome.is_created()
        );

        Ok(outcome.into_booking())
    }
}
