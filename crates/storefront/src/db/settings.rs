//! Shop settings storage.
//!
//! Keys are restricted to [`SettingKey`]; rows with keys this build does not
//! know are skipped on read.

use serde_json::{Map, Value};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::SettingKey;

/// Repository for shop settings.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All known settings as a JSON object keyed by setting name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Map<String, Value>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, Value)>("SELECT key, value FROM settings ORDER BY key")
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter(|(key, _)| key.parse::<SettingKey>().is_ok())
            .collect())
    }

    /// Store a setting, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set(&self, key: SettingKey, value: &Value) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(key.as_str())
        .bind(value)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
