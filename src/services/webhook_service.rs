//! Provider webhook reconciliation.
//!
//! The provider retries any delivery that is not acknowledged, so once a
//! signature checks out every business outcome is acknowledged. Only an
//! internal failure (store down) is surfaced so the delivery is retried.

use crate::auth;
use crate::error::AppResult;
use crate::models::{Booking, OrderNotes, WebhookEvent};
use crate::services::audit::AuditTrailService;
use crate::services::settlement::{PaidStay, SettleOutcome, SettlementService};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What happened to an authenticated delivery
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// A new paid booking was created
    Created(Booking),
    /// The payment had already been settled
    AlreadySettled(Booking),
    /// Not a captured-payment event
    Ignored { event: String },
    /// Acknowledged without a booking; recorded in the audit trail
    Skipped { reason: String },
}

impl WebhookOutcome {
    pub fn booking(&self) -> Option<&Booking> {
        match self {
            WebhookOutcome::Created(b) | WebhookOutcome::AlreadySettled(b) => Some(b),
            _ => None,
        }
    }
}

impl From<SettleOutcome> for WebhookOutcome {
    fn from(outcome: SettleOutcome) -> Self {
        match outcome {
            SettleOutcome::Created(b) => WebhookOutcome::Created(b),
            SettleOutcome::AlreadySettled(b) => WebhookOutcome::AlreadySettled(b),
        }
    }
}

pub struct WebhookReconciler {
    settlement: Arc<SettlementService>,
    audit: Arc<AuditTrailService>,
    webhook_secret: String,
}

impl WebhookReconciler {
    pub fn new(
        settlement: Arc<SettlementService>,
        audit: Arc<AuditTrailService>,
        webhook_secret: String,
    ) -> Self {
        Self {
            settlement,
            audit,
            webhook_secret,
        }
    }

    /// Authenticate and reconcile one delivery.
    ///
    /// `raw_body` must be the exact bytes received. Returns
    /// `InvalidSignature` (with no side effects) for unauthenticated
    /// deliveries.
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature_header: &str,
    ) -> AppResult<WebhookOutcome> {
        if let Err(e) = auth::verify_webhook_signature(&self.webhook_secret, raw_body, signature_header) {
            warn!("Rejected webhook delivery: {}", e);
            return Err(e);
        }

        let event: WebhookEvent = match serde_json::from_slice(raw_body) {
            Ok(event) => event,
            Err(e) => {
                error!("Authenticated webhook body could not be parsed: {}", e);
                return self
                    .skip(None, None, "malformed body", serde_json::json!({ "error": e.to_string() }))
                    .await;
            }
        };

        if !event.is_payment_captured() {
            info!("Ignoring webhook event {}", event.event);
            return Ok(WebhookOutcome::Ignored { event: event.event });
        }

        let Some(payment) = event.payment() else {
            error!("payment.captured event without a payment entity");
            return self
                .skip(None, None, "missing payment entity", serde_json::Value::Null)
                .await;
        };

        let notes = match OrderNotes::from_value(&payment.notes) {
            Ok(notes) => notes,
            Err(missing) => {
                error!(
                    "Payment {} captured with unusable booking metadata: {:?}",
                    payment.id, missing
                );
                return self
                    .skip(
                        Some(&payment.id),
                        None,
                        "missing booking metadata",
                        serde_json::json!({ "fields": missing, "order_id": payment.order_id }),
                    )
                    .await;
            }
        };

        let stay = PaidStay::from_notes(&notes, payment.amount);

        match self.settlement.settle(&payment.id, &stay, "webhook").await {
            Ok(outcome) => {
                info!(
                    "Webhook settled payment {} as booking {} (created={})",
                    payment.id,
                    outcome.booking().id,
                    outcome.is_created()
                );
                Ok(outcome.into())
            }
            Err(e) if e.is_client_error() => {
                // Paid but unbookable: needs manual follow-up (refund)
                error!(
                    "Captured payment {} could not be booked on listing {}: {}",
                    payment.id, notes.listing_id, e
                );
                self.skip(
                    Some(&payment.id),
                    Some(notes.listing_id),
                    e.kind(),
                    serde_json::json!({
                        "error": e.to_string(),
                        "user_id": notes.user_id.to_string(),
                        "start_date": notes.start_date.to_rfc3339(),
                        "end_date": notes.end_date.to_rfc3339(),
                        "amount": payment.amount,
                    }),
                )
                .await
            }
            Err(e) => {
                error!("Webhook reconciliation failed for payment {}: {}", payment.id, e);
                Err(e)
            }
        }
    }

    async fn skip(
        &self,
        payment_reference: Option<&str>,
        listing_id: Option<Uuid>,
        reason: &str,
        details: serde_json::Value,
    ) -> AppResult<WebhookOutcome> {
        if let Err(e) = self
            .audit
            .log_reconciliation_skipped(payment_reference, listing_id, reason, details)
            .await
        {
            warn!("Failed to audit skipped webhook: {}", e);
        }
        Ok(WebhookOutcome::Skipped {
            reason: reason.to_string(),
        })
    }
}
