//! PostgreSQL repository tests.
//!
//! These run against `TEST_DATABASE_URL` and return early when it is not set.
//! Every test creates its own users and listings so they can share a database.

mod helpers;

use helpers::*;
use sqlx::Row;
use stayhub_backend::error::RepositoryError;
use stayhub_backend::models::*;
use stayhub_backend::repositories::*;
use std::sync::Arc;
use uuid::Uuid;

fn new_booking(user: &User, listing: &Listing, start: u32, end: u32, reference: Option<&str>) -> NewBooking {
    NewBooking {
        user_id: user.id,
        listing_id: listing.id,
        start_date: day(start),
        end_date: day(end),
        guests: 2,
        subtotal: 300,
        platform_fee: 30,
        total_price: 330,
        status: BookingStatus::Paid,
        payment_reference: reference.map(str::to_string),
    }
}

fn unique_reference() -> String {
    format!("pay_{}", Uuid::new_v4().simple())
}

// ============================================================================
// Connection / Migration Tests
// ============================================================================

#[tokio::test]
async fn test_migrations_ran() {
    let Some(db) = TestDatabase::connect().await else { return };

    for table in ["users", "listings", "bookings"] {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&db.pool)
        .await
        .expect("Failed to query information_schema")
        .get(0);
        assert!(exists, "Table {} should exist", table);
    }
}

// ============================================================================
// User / Listing Repository Tests
// ============================================================================

#[tokio::test]
async fn test_user_and_listing_round_trip() {
    let Some(db) = TestDatabase::connect().await else { return };

    let owner = db.create_user(UserRole::Admin).await;
    assert!(owner.is_admin());

    let found = db.users.find_by_id(owner.id).await.unwrap().expect("user exists");
    assert_eq!(found.username, owner.username);
    let by_name = db.users.find_by_username(&owner.username).await.unwrap();
    assert_eq!(by_name.map(|u| u.id), Some(owner.id));

    let listing = db.create_listing(&owner, 2_500).await;
    let found = db.listings.find_by_id(listing.id).await.unwrap().expect("listing exists");
    assert_eq!(found.price, 2_500);
    assert!(found.is_owned_by(owner.id));

    let owned = db.listings.find_by_owner(owner.id).await.unwrap();
    assert_eq!(owned.len(), 1);
}

// ============================================================================
// Booking Repository Tests
// ============================================================================

#[tokio::test]
async fn test_insert_and_lookup_by_reference() {
    let Some(db) = TestDatabase::connect().await else { return };
    let user = db.create_user(UserRole::User).await;
    let listing = db.create_listing(&user, 100).await;
    let reference = unique_reference();

    let booking = db
        .bookings
        .insert(new_booking(&user, &listing, 1, 4, Some(&reference)))
        .await
        .expect("insert succeeds");

    assert_eq!(booking.status, BookingStatus::Paid);
    assert_eq!(booking.total_price, 330);
    assert_eq!(booking.start_date, day(1));

    let by_reference = db
        .bookings
        .find_by_payment_reference(&reference)
        .await
        .unwrap()
        .expect("found by reference");
    assert_eq!(by_reference.id, booking.id);

    let by_id = db.bookings.find_by_id(booking.id).await.unwrap();
    assert_eq!(by_id, Some(booking));
}

#[tokio::test]
async fn test_exclusion_constraint_reports_overlap() {
    let Some(db) = TestDatabase::connect().await else { return };
    let user = db.create_user(UserRole::User).await;
    let listing = db.create_listing(&user, 100).await;

    db.bookings
        .insert(new_booking(&user, &listing, 1, 4, Some(&unique_reference())))
        .await
        .unwrap();

    let err = db
        .bookings
        .insert(new_booking(&user, &listing, 3, 6, Some(&unique_reference())))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Overlap(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_abutting_ranges_are_allowed() {
    let Some(db) = TestDatabase::connect().await else { return };
    let user = db.create_user(UserRole::User).await;
    let listing = db.create_listing(&user, 100).await;

    db.bookings
        .insert(new_booking(&user, &listing, 1, 4, None))
        .await
        .unwrap();
    db.bookings
        .insert(new_booking(&user, &listing, 4, 6, None))
        .await
        .expect("checkout day is free for the next guest");

    assert!(db
        .bookings
        .find_active_overlap(listing.id, day(6), day(8))
        .await
        .unwrap()
        .is_none());
    assert!(db
        .bookings
        .find_active_overlap(listing.id, day(5), day(8))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_duplicate_reference_is_rejected() {
    let Some(db) = TestDatabase::connect().await else { return };
    let user = db.create_user(UserRole::User).await;
    let listing = db.create_listing(&user, 100).await;
    let reference = unique_reference();

    db.bookings
        .insert(new_booking(&user, &listing, 1, 2, Some(&reference)))
        .await
        .unwrap();

    let err = db
        .bookings
        .insert(new_booking(&user, &listing, 10, 12, Some(&reference)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Duplicate(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_cancelled_booking_releases_dates_and_is_terminal() {
    let Some(db) = TestDatabase::connect().await else { return };
    let user = db.create_user(UserRole::User).await;
    let listing = db.create_listing(&user, 100).await;

    let booking = db
        .bookings
        .insert(new_booking(&user, &listing, 1, 4, None))
        .await
        .unwrap();

    let cancelled = db
        .bookings
        .transition_status(booking.id, BookingStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    // Re-applying the same status is a no-op
    let again = db
        .bookings
        .transition_status(booking.id, BookingStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(again.status, BookingStatus::Cancelled);

    let err = db
        .bookings
        .transition_status(booking.id, BookingStatus::Paid)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ConstraintViolation(_)));

    db.bookings
        .insert(new_booking(&user, &listing, 2, 3, None))
        .await
        .expect("cancelled range is free again");
}

#[tokio::test]
async fn test_transition_missing_booking() {
    let Some(db) = TestDatabase::connect().await else { return };

    let err = db
        .bookings
        .transition_status(Uuid::new_v4(), BookingStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[tokio::test]
async fn test_listing_queries() {
    let Some(db) = TestDatabase::connect().await else { return };
    let guest = db.create_user(UserRole::User).await;
    let owner = db.create_user(UserRole::User).await;
    let listing = db.create_listing(&owner, 100).await;

    let later = db
        .bookings
        .insert(new_booking(&guest, &listing, 10, 12, None))
        .await
        .unwrap();
    let earlier = db
        .bookings
        .insert(new_booking(&guest, &listing, 1, 3, None))
        .await
        .unwrap();

    let by_listing = db.bookings.find_by_listing(listing.id).await.unwrap();
    let ids: Vec<Uuid> = by_listing.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![earlier.id, later.id]);

    let by_user = db.bookings.find_by_user(guest.id).await.unwrap();
    assert_eq!(by_user.len(), 2);
    assert_eq!(by_user[0].id, earlier.id, "newest first");

    assert!(db.bookings.find_by_user(owner.id).await.unwrap().is_empty());
    assert!(!db.bookings.find_all(10).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_inserts_have_one_winner() {
    let Some(db) = TestDatabase::connect().await else { return };
    let user = db.create_user(UserRole::User).await;
    let listing = db.create_listing(&user, 100).await;
    let store: Arc<dyn BookingStore> = db.bookings.clone();

    let handles: Vec<_> = (0..8u32)
        .map(|i| {
            let store = store.clone();
            let booking = new_booking(&user, &listing, 1 + i % 3, 5 + i % 3, Some(&unique_reference()));
            tokio::spawn(async move { store.insert(booking).await })
        })
        .collect();

    let mut winners = 0;
    for result in futures::future::join_all(handles).await {
        match result.expect("task panicked") {
            Ok(_) => winners += 1,
            Err(RepositoryError::Overlap(_)) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(winners, 1);

    let active: Vec<_> = db
        .bookings
        .find_by_listing(listing.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.status.is_active())
        .collect();
    assert_eq!(active.len(), 1);
}
