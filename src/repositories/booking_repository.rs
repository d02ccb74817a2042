use crate::error::RepositoryError;
use crate::models::{Booking, BookingStatus, NewBooking};
use crate::repositories::store::BookingStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, user_id, listing_id, start_date, end_date, guests, \
     subtotal, platform_fee, total_price, status, payment_reference, created_at, updated_at";

/// Raw `bookings` row; status is TEXT in the database
#[derive(Debug, FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    listing_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    guests: i32,
    subtotal: i64,
    platform_fee: i64,
    total_price: i64,
    status: String,
    payment_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = BookingStatus::from_str(&row.status).map_err(RepositoryError::Storage)?;
        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            listing_id: row.listing_id,
            start_date: row.start_date,
            end_date: row.end_date,
            guests: row.guests,
            subtotal: row.subtotal,
            platform_fee: row.platform_fee,
            total_price: row.total_price,
            status,
            payment_reference: row.payment_reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, RepositoryError> {
    rows.into_iter().map(Booking::try_from).collect()
}

/// Repository for booking data access.
///
/// Double booking is prevented by the `bookings_no_overlap` exclusion
/// constraint and duplicate payment capture by the partial unique index on
/// `payment_reference`; both surface here as [`RepositoryError`] variants.
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new BookingRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepositoryError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Booking>, RepositoryError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_reference = $1");
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn find_active_overlap(
        &self,
        listing_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Booking>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE listing_id = $1
              AND status IN ('pending', 'paid')
              AND start_date < $3
              AND end_date > $2
            ORDER BY start_date
            LIMIT 1
            "#
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(listing_id)
            .bind(start)
            .bind(end)
            .fetch_optional(&self.pool)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn insert(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO bookings
                (user_id, listing_id, start_date, end_date, guests,
                 subtotal, platform_fee, total_price, status, payment_reference)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking.user_id)
            .bind(booking.listing_id)
            .bind(booking.start_date)
            .bind(booking.end_date)
            .bind(booking.guests)
            .bind(booking.subtotal)
            .bind(booking.platform_fee)
            .bind(booking.total_price)
            .bind(booking.status.as_str())
            .bind(booking.payment_reference.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Booking::try_from(row)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        next: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so concurrent transitions serialise on it
        let select = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE");
        let current: Booking = sqlx::query_as::<_, BookingRow>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Booking {} not found", id)))?
            .try_into()?;

        if current.status == next {
            tx.commit().await?;
            return Ok(current);
        }

        if !current.status.can_transition_to(next) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "Booking {} cannot move from {} to {}",
                id,
                current.status.as_str(),
                next.as_str()
            )));
        }

        let update = format!(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, BookingRow>(&update)
            .bind(id)
            .bind(next.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Booking::try_from(row)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Booking>, RepositoryError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        into_bookings(rows)
    }

    async fn find_by_listing(&self, listing_id: Uuid) -> Result<Vec<Booking>, RepositoryError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE listing_id = $1 ORDER BY start_date"
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(listing_id)
            .fetch_all(&self.pool)
            .await?;
        into_bookings(rows)
    }

    async fn find_all(&self, limit: i64) -> Result<Vec<Booking>, RepositoryError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT $1");
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        into_bookings(rows)
    }
}
