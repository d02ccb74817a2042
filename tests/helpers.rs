#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use stayhub_backend::auth;
use stayhub_backend::config::{BookingPolicy, DatabaseConfig, PaymentConfig};
use stayhub_backend::database::{create_pool, run_migrations};
use stayhub_backend::models::*;
use stayhub_backend::repositories::*;
use stayhub_backend::services::*;
use stayhub_backend::{AppState, Stores};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Fully wired application over in-memory stores and a mock gateway
pub struct TestApp {
    pub state: AppState,
    pub bookings: InMemoryBookingStore,
    pub listings: InMemoryListingStore,
    pub users: InMemoryUserStore,
    pub gateway: Arc<MockPaymentGateway>,
    pub audit: Arc<AuditTrailService>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(MockPaymentGateway::new(), None)
    }

    pub fn with_gateway(gateway: MockPaymentGateway) -> Self {
        Self::build(gateway, None)
    }

    pub fn with_internal_secret(secret: &str) -> Self {
        Self::build(MockPaymentGateway::new(), Some(secret.to_string()))
    }

    fn build(gateway: MockPaymentGateway, internal_secret: Option<String>) -> Self {
        let bookings = InMemoryBookingStore::new();
        let listings = InMemoryListingStore::new();
        let users = InMemoryUserStore::new();
        let gateway = Arc::new(gateway);
        let audit = Arc::new(AuditTrailService::in_memory());

        let stores = Stores {
            bookings: Arc::new(bookings.clone()),
            listings: Arc::new(listings.clone()),
            users: Arc::new(users.clone()),
        };
        let state = AppState::new(
            stores,
            gateway.clone(),
            audit.clone(),
            &payment_config(),
            &BookingPolicy::default(),
            internal_secret,
        );

        Self {
            state,
            bookings,
            listings,
            users,
            gateway,
            audit,
        }
    }

    pub fn router(&self) -> axum::Router {
        stayhub_backend::http::router(self.state.clone())
    }

    pub fn create_user(&self, name: &str, role: UserRole) -> User {
        self.users
            .insert(User::new(
                name.to_string(),
                format!("{}@example.com", name),
                role,
            ))
            .expect("Failed to create test user")
    }

    pub fn create_listing(&self, owner: &User, price: i64) -> Listing {
        self.listings
            .insert(Listing::new(
                owner.id,
                "Seaside cottage".to_string(),
                Some("Goa".to_string()),
                price,
            ))
            .expect("Failed to create test listing")
    }

    /// Open a provider order for a stay without the availability check, as
    /// a client holding an order from before the dates were taken would
    pub async fn open_order(&self, user: &User, listing: &Listing, start: u32, end: u32) -> PaymentOrder {
        let notes = notes_for(user, listing, start, end);
        self.gateway
            .create_order(&OrderRequest {
                amount: (notes.subtotal + notes.platform_fee) * 100,
                currency: "INR".to_string(),
                receipt: format!("receipt_{}", Uuid::new_v4().simple()),
                notes,
            })
            .await
            .expect("Failed to open test order")
    }

    /// Open an order and return the signed checkout result for `payment_id`
    pub async fn checkout(
        &self,
        user: &User,
        listing: &Listing,
        start: u32,
        end: u32,
        payment_id: &str,
    ) -> PaymentConfirmation {
        let order = self.open_order(user, listing, start, end).await;
        confirmation(&order.id, payment_id)
    }

    /// Store a paid booking directly, bypassing payment
    pub async fn seed_booking(
        &self,
        user: &User,
        listing: &Listing,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Booking {
        self.bookings
            .insert(NewBooking {
                user_id: user.id,
                listing_id: listing.id,
                start_date: start,
                end_date: end,
                guests: 1,
                subtotal: 100,
                platform_fee: 10,
                total_price: 110,
                status: BookingStatus::Paid,
                payment_reference: Some(format!("pay_seed_{}", Uuid::new_v4().simple())),
            })
            .await
            .expect("Failed to seed booking")
    }
}

pub fn payment_config() -> PaymentConfig {
    PaymentConfig {
        key_id: KEY_ID.to_string(),
        key_secret: KEY_SECRET.to_string(),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        ..PaymentConfig::default()
    }
}

/// Midnight UTC on day `d` of a month safely in the future
pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, d, 0, 0, 0).unwrap()
}

pub fn stay(listing: &Listing, start: u32, end: u32) -> StayRequest {
    StayRequest {
        listing_id: listing.id,
        start_date: day(start),
        end_date: day(end),
        guests: 2,
    }
}

/// Checkout confirmation exactly as the provider would sign it
pub fn confirmation(order_id: &str, payment_id: &str) -> PaymentConfirmation {
    PaymentConfirmation {
        order_id: order_id.to_string(),
        payment_id: payment_id.to_string(),
        signature: auth::payment_signature(KEY_SECRET, order_id, payment_id).unwrap(),
    }
}

/// `payment.captured` delivery carrying the given order notes
pub fn captured_webhook(payment_id: &str, order_id: &str, notes: &OrderNotes, amount: i64) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "entity": "payment",
                    "order_id": order_id,
                    "amount": amount,
                    "currency": "INR",
                    "status": "captured",
                    "notes": notes.to_map()
                }
            }
        },
        "created_at": Utc::now().timestamp()
    }))
    .unwrap()
}

pub fn sign_webhook(body: &[u8]) -> String {
    auth::hmac_hex(WEBHOOK_SECRET, body).unwrap()
}

/// Order notes for a stay, priced at the listing's current rate
pub fn notes_for(user: &User, listing: &Listing, start: u32, end: u32) -> OrderNotes {
    let quote = price_stay(listing.price, day(start), day(end)).expect("Failed to price stay");
    OrderNotes {
        listing_id: listing.id,
        user_id: user.id,
        start_date: day(start),
        end_date: day(end),
        guests: 2,
        subtotal: quote.subtotal,
        platform_fee: quote.platform_fee,
    }
}

pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    Utc::now() + Duration::hours(hours)
}

/// Postgres-backed fixture; `None` when `TEST_DATABASE_URL` is not set
pub struct TestDatabase {
    pub pool: PgPool,
    pub bookings: Arc<BookingRepository>,
    pub listings: Arc<ListingRepository>,
    pub users: Arc<UserRepository>,
}

impl TestDatabase {
    pub async fn connect() -> Option<Self> {
        let url = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                eprintln!("TEST_DATABASE_URL not set; skipping database test");
                return None;
            }
        };

        let config = DatabaseConfig {
            url,
            max_connections: 5,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 300,
            max_lifetime_secs: 600,
            test_before_acquire: true,
        };

        let pool = create_pool(&config)
            .await
            .expect("Failed to create test database pool");

        run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self {
            bookings: Arc::new(BookingRepository::new(pool.clone())),
            listings: Arc::new(ListingRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool.clone())),
            pool,
        })
    }

    /// User with a unique name so tests can share one database
    pub async fn create_user(&self, role: UserRole) -> User {
        let name = format!("user_{}", Uuid::new_v4().simple());
        self.users
            .create(&name, &format!("{}@example.com", name), role)
            .await
            .expect("Failed to create test user")
    }

    pub async fn create_listing(&self, owner: &User, price: i64) -> Listing {
        self.listings
            .create(owner.id, "Test listing", None, price)
            .await
            .expect("Failed to create test listing")
    }
}
