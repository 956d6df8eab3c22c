//! Tracking pixel repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vitrina_core::TrackingPixelId;

use super::{RepositoryError, parse_column};
use crate::models::{NewTrackingPixel, TrackingPixel, TrackingPixelPatch};

#[derive(Debug, sqlx::FromRow)]
struct PixelRow {
    id: i32,
    provider: String,
    counter_id: String,
    snippet: Option<String>,
    placement: String,
    is_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PixelRow> for TrackingPixel {
    type Error = RepositoryError;

    fn try_from(row: PixelRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TrackingPixelId::new(row.id),
            provider: parse_column(&row.provider)?,
            counter_id: row.counter_id,
            snippet: row.snippet,
            placement: parse_column(&row.placement)?,
            is_enabled: row.is_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for tracking pixels.
pub struct TrackingPixelRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TrackingPixelRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All pixels, or only enabled ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, enabled_only: bool) -> Result<Vec<TrackingPixel>, RepositoryError> {
        let rows = sqlx::query_as::<_, PixelRow>(
            r"
            SELECT id, provider, counter_id, snippet, placement, is_enabled,
                   created_at, updated_at
            FROM tracking_pixels
            WHERE is_enabled OR NOT $1
            ORDER BY id
            ",
        )
        .bind(enabled_only)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, pixel: &NewTrackingPixel) -> Result<TrackingPixel, RepositoryError> {
        sqlx::query_as::<_, PixelRow>(
            r"
            INSERT INTO tracking_pixels (provider, counter_id, snippet, placement, is_enabled)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, provider, counter_id, snippet, placement, is_enabled,
                      created_at, updated_at
            ",
        )
        .bind(pixel.provider.as_str())
        .bind(&pixel.counter_id)
        .bind(&pixel.snippet)
        .bind(pixel.placement.as_str())
        .bind(pixel.is_enabled)
        .fetch_one(self.pool)
        .await?
        .try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the pixel does not exist.
    pub async fn update(
        &self,
        id: TrackingPixelId,
        patch: &TrackingPixelPatch,
    ) -> Result<TrackingPixel, RepositoryError> {
        sqlx::query_as::<_, PixelRow>(
            r"
            UPDATE tracking_pixels SET
                provider   = COALESCE($2, provider),
                counter_id = COALESCE($3, counter_id),
                snippet    = CASE WHEN $4 THEN $5 ELSE snippet END,
                placement  = COALESCE($6, placement),
                is_enabled = COALESCE($7, is_enabled),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, provider, counter_id, snippet, placement, is_enabled,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(patch.provider.map(|p| p.as_str()))
        .bind(&patch.counter_id)
        .bind(patch.snippet.is_some())
        .bind(patch.snippet.clone().flatten())
        .bind(patch.placement.map(|p| p.as_str()))
        .bind(patch.is_enabled)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the pixel does not exist.
    pub async fn delete(&self, id: TrackingPixelId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tracking_pixels WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
