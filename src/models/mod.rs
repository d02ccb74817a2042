//! Domain models for the StayHub booking service.
//!
//! Bookings are owned by this service; users and listings are collaborator
//! records it only reads.

pub mod booking;
pub mod listing;
pub mod payment;
pub mod user;

// Re-export all models for convenient access
pub use booking::{parse_stay_date, ranges_overlap, Booking, BookingStatus, NewBooking};
pub use listing::Listing;
pub use payment::{
    OrderHandle, OrderNotes, OrderRequest, PaymentEntity, PaymentOrder, WebhookEvent,
    PAYMENT_CAPTURED,
};
pub use user::{Requester, User, UserRole};
