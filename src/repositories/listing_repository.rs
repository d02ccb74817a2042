use crate::error::RepositoryError;
use crate::models::Listing;
use crate::repositories::store::ListingStore;
use async_trait::async_trait;
use sqlx::{PgPool, Result as SqlxResult};
use uuid::Uuid;

/// Repository for listing reads (listing management lives elsewhere)
pub struct ListingRepository {
    pool: PgPool,
}

impl ListingRepository {
    /// Create a new ListingRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new listing
    pub async fn create(
        &self,
        owner_id: Uuid,
        title: &str,
        location: Option<&str>,
        price: i64,
    ) -> SqlxResult<Listing> {
        sqlx::query_as::<_, Listing>(
            r#"
            INSERT INTO listings (owner_id, title, location, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, title, location, price, created_at
            "#,
        )
        .bind(owner_id)
        .bind(title)
        .bind(location)
        .bind(price)
        .fetch_one(&self.pool)
        .await
    }

    /// Find a listing by UUID
    pub async fn find_by_id(&self, id: Uuid) -> SqlxResult<Option<Listing>> {
        sqlx::query_as::<_, Listing>(
            r#"
            SELECT id, owner_id, title, location, price, created_at
            FROM listings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find all listings of an owner
    pub async fn find_by_owner(&self, owner_id: Uuid) -> SqlxResult<Vec<Listing>> {
        sqlx::query_as::<_, Listing>(
            r#"
            SELECT id, owner_id, title, location, price, created_at
            FROM listings
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl ListingStore for ListingRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>, RepositoryError> {
        Ok(ListingRepository::find_by_id(self, id).await?)
    }
}
