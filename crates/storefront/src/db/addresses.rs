//! Address repository.
//!
//! Every mutation runs in one transaction that first locks the owner's
//! `users` row, so two requests for the same user never interleave their
//! flag changes. The flag changes themselves come from
//! [`vitrina_core::address_book`]; this module only applies them.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use vitrina_core::address_book::{self, AddressSlot};
use vitrina_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressFields, AddressPatch};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    user_id: i32,
    recipient_name: String,
    phone: String,
    country: String,
    region: Option<String>,
    city: String,
    street: String,
    house: String,
    apartment: Option<String>,
    postal_code: Option<String>,
    comment: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            recipient_name: row.recipient_name,
            phone: row.phone,
            country: row.country,
            region: row.region,
            city: row.city,
            street: row.street,
            house: row.house,
            apartment: row.apartment,
            postal_code: row.postal_code,
            comment: row.comment,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SlotRow {
    id: i32,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl From<SlotRow> for AddressSlot {
    fn from(row: SlotRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            is_default: row.is_default,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Book locking
// =============================================================================

/// Lock `user_id`'s row and read their address book.
///
/// Returns `NotFound` if the user does not exist.
pub(crate) async fn lock_address_book(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<AddressSlot>, RepositoryError> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;

    let rows = sqlx::query_as::<_, SlotRow>(
        r"
        SELECT id, is_default, created_at
        FROM addresses
        WHERE user_id = $1
        ORDER BY created_at, id
        ",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

async fn clear_defaults(conn: &mut PgConnection, ids: &[AddressId]) -> Result<(), RepositoryError> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r"
        UPDATE addresses
        SET is_default = FALSE, updated_at = clock_timestamp()
        WHERE id = ANY($1)
        ",
    )
    .bind(ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Delete `target` from a locked book and promote a replacement default if
/// the plan calls for one.
///
/// The row is deleted before the promotion so the one-default unique index
/// never sees two defaults at once. Both happen in the caller's transaction.
pub(crate) async fn delete_from_locked_book(
    conn: &mut PgConnection,
    book: &[AddressSlot],
    target: AddressId,
) -> Result<(), RepositoryError> {
    let plan =
        address_book::plan_delete(book, target).map_err(|_| RepositoryError::NotFound)?;

    sqlx::query("DELETE FROM addresses WHERE id = $1")
        .bind(target)
        .execute(&mut *conn)
        .await?;

    if let Some(promote) = plan.promote {
        tracing::debug!(address_id = %promote, "Promoting replacement default address");
        sqlx::query(
            r"
            UPDATE addresses
            SET is_default = TRUE, updated_at = clock_timestamp()
            WHERE id = $1
            ",
        )
        .bind(promote)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for a user's shipping addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's addresses, default first, then in creation order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, recipient_name, phone, country, region, city,
                   street, house, apartment, postal_code, comment, is_default,
                   created_at, updated_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at, id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist or
    /// belongs to another user.
    pub async fn get(&self, user_id: UserId, id: AddressId) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, user_id, recipient_name, phone, country, region, city,
                   street, house, apartment, postal_code, comment, is_default,
                   created_at, updated_at
            FROM addresses
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .map(Into::into)
        .ok_or(RepositoryError::NotFound)
    }

    /// Create an address.
    ///
    /// With `is_default` set (or when this is the user's first address) the
    /// previous default is cleared before the insert, in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if a statement fails; nothing is
    /// written in that case.
    pub async fn create(
        &self,
        user_id: UserId,
        fields: &AddressFields,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let book = lock_address_book(&mut tx, user_id).await?;
        let plan = address_book::plan_create(&book, fields.is_default);
        clear_defaults(&mut tx, &plan.clear_defaults).await?;

        let row = sqlx::query_as::<_, AddressRow>(
            r"
            INSERT INTO addresses (user_id, recipient_name, phone, country, region, city,
                                   street, house, apartment, postal_code, comment, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, user_id, recipient_name, phone, country, region, city,
                      street, house, apartment, postal_code, comment, is_default,
                      created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(&fields.recipient_name)
        .bind(&fields.phone)
        .bind(&fields.country)
        .bind(&fields.region)
        .bind(&fields.city)
        .bind(&fields.street)
        .bind(&fields.house)
        .bind(&fields.apartment)
        .bind(&fields.postal_code)
        .bind(&fields.comment)
        .bind(plan.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Update an address.
    ///
    /// `is_default: true` moves the default here, clearing it elsewhere first.
    /// `is_default: false` on the current default is ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist or
    /// belongs to another user.
    /// Returns `RepositoryError::Database` if a statement fails; nothing is
    /// written in that case.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        patch: &AddressPatch,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let book = lock_address_book(&mut tx, user_id).await?;
        let plan = address_book::plan_update(&book, id, patch.is_default)
            .map_err(|_| RepositoryError::NotFound)?;
        clear_defaults(&mut tx, &plan.clear_defaults).await?;

        let row = sqlx::query_as::<_, AddressRow>(
            r"
            UPDATE addresses SET
                recipient_name = COALESCE($3, recipient_name),
                phone          = COALESCE($4, phone),
                country        = COALESCE($5, country),
                region         = CASE WHEN $6::text IS NULL THEN region ELSE NULLIF($6, '') END,
                city           = COALESCE($7, city),
                street         = COALESCE($8, street),
                house          = COALESCE($9, house),
                apartment      = CASE WHEN $10::text IS NULL THEN apartment ELSE NULLIF($10, '') END,
                postal_code    = CASE WHEN $11::text IS NULL THEN postal_code ELSE NULLIF($11, '') END,
                comment        = CASE WHEN $12::text IS NULL THEN comment ELSE NULLIF($12, '') END,
                is_default     = $13,
                updated_at     = clock_timestamp()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, recipient_name, phone, country, region, city,
                      street, house, apartment, postal_code, comment, is_default,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(&patch.recipient_name)
        .bind(&patch.phone)
        .bind(&patch.country)
        .bind(&patch.region)
        .bind(&patch.city)
        .bind(&patch.street)
        .bind(&patch.house)
        .bind(&patch.apartment)
        .bind(&patch.postal_code)
        .bind(&patch.comment)
        .bind(plan.is_default)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Delete an address, promoting the oldest remaining address if the
    /// default was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist or
    /// belongs to another user.
    /// Returns `RepositoryError::Database` if a statement fails; nothing is
    /// written in that case.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let book = lock_address_book(&mut tx, user_id).await?;
        delete_from_locked_book(&mut tx, &book, id).await?;

        tx.commit().await?;

        Ok(())
    }
}
