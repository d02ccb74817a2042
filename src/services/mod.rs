pub mod audit;
pub mod availability;
pub mod booking_service;
pub mod order_service;
pub mod payment_gateway;
pub mod pricing;
pub mod settlement;
pub mod verification_service;
pub mod webhook_service;

pub use audit::{AuditLogEntry, AuditTrailService};
pub use availability::AvailabilityChecker;
pub use booking_service::BookingService;
pub use order_service::{PaymentOrderService, StayRequest};
pub use payment_gateway::{MockPaymentGateway, PaymentGateway, RazorpayClient};
pub use pricing::{price_stay, PriceQuote};
pub use settlement::{PaidStay, SettleOutcome, SettlementService};
pub use verification_service::{PaymentConfirmation, PaymentVerificationService};
pub use webhook_service::{WebhookOutcome, WebhookReconciler};
