//! StayHub Booking Backend Library
//!
//! This module exposes the backend components for use by tests and other consumers.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod models;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use config::{BookingPolicy, PaymentConfig};
use repositories::*;
use services::{
    AuditTrailService, BookingService, PaymentGateway, PaymentOrderService,
    PaymentVerificationService, SettlementService, WebhookReconciler,
};
use std::sync::Arc;

/// Storage backends the services run against
#[derive(Clone)]
pub struct Stores {
    pub bookings: Arc<dyn BookingStore>,
    pub listings: Arc<dyn ListingStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            bookings: Arc::new(BookingRepository::new(pool.clone())),
            listings: Arc::new(ListingRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool)),
        }
    }
}

/// Application state containing all services
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub bookings: Arc<BookingService>,
    pub orders: Arc<PaymentOrderService>,
    pub verifier: Arc<PaymentVerificationService>,
    pub webhooks: Arc<WebhookReconciler>,
    pub audit: Arc<AuditTrailService>,
    pub internal_auth_secret: Option<String>,
}

impl AppState {
    /// Wire every service over the given stores and payment gateway
    pub fn new(
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        audit: Arc<AuditTrailService>,
        payment: &PaymentConfig,
        policy: &BookingPolicy,
        internal_auth_secret: Option<String>,
    ) -> Self {
        let settlement = Arc::new(SettlementService::new(
            stores.bookings.clone(),
            stores.listings.clone(),
            audit.clone(),
        ));

        Self {
            users: stores.users.clone(),
            bookings: Arc::new(BookingService::new(
                stores.bookings.clone(),
                stores.listings.clone(),
                audit.clone(),
                policy.cancellation_window(),
            )),
            orders: Arc::new(PaymentOrderService::new(
                stores.bookings.clone(),
                stores.listings.clone(),
                gateway.clone(),
                payment.key_id.clone(),
                payment.currency.clone(),
            )),
            verifier: Arc::new(PaymentVerificationService::new(
                settlement.clone(),
                gateway,
                payment.key_secret.clone(),
            )),
            webhooks: Arc::new(WebhookReconciler::new(
                settlement,
                audit.clone(),
                payment.webhook_secret().to_string(),
            )),
            audit,
            internal_auth_secret,
        }
    }
}
