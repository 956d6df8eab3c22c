//! One-time login code storage.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use vitrina_core::VerificationCodeId;

use super::RepositoryError;
use super::users::Contact;

/// How long a code stays valid, in minutes.
pub const CODE_TTL_MINUTES: i64 = 10;

/// Wrong guesses allowed per code.
pub const MAX_ATTEMPTS: i32 = 5;

/// Result of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    /// Code matched and is now consumed.
    Accepted,
    /// Code did not match; the attempt was counted.
    Rejected,
    /// No live code: never sent, expired, consumed or out of attempts.
    Missing,
}

#[derive(Debug, sqlx::FromRow)]
struct CodeRow {
    id: i32,
    code: String,
    attempts: i32,
}

/// Repository for verification codes.
pub struct VerificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VerificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a fresh code for `contact`, retiring any earlier live codes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn issue(
        &self,
        contact: &Contact,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<VerificationCodeId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE verification_codes SET consumed_at = $3
            WHERE channel = $1 AND destination = $2 AND consumed_at IS NULL
            ",
        )
        .bind(contact.channel())
        .bind(contact.destination())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let id = sqlx::query_scalar::<_, i32>(
            r"
            INSERT INTO verification_codes (channel, destination, code, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(contact.channel())
        .bind(contact.destination())
        .bind(code)
        .bind(now + Duration::minutes(CODE_TTL_MINUTES))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(VerificationCodeId::new(id))
    }

    /// Check `submitted` against the newest live code for `contact`.
    ///
    /// The code row is locked while checking so parallel guesses cannot
    /// exceed the attempt limit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn check(
        &self,
        contact: &Contact,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeCheck, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CodeRow>(
            r"
            SELECT id, code, attempts
            FROM verification_codes
            WHERE channel = $1 AND destination = $2
              AND consumed_at IS NULL AND expires_at > $3 AND attempts < $4
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            ",
        )
        .bind(contact.channel())
        .bind(contact.destination())
        .bind(now)
        .bind(MAX_ATTEMPTS)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(CodeCheck::Missing);
        };

        let outcome = if constant_time_eq(row.code.as_bytes(), submitted.trim().as_bytes()) {
            sqlx::query("UPDATE verification_codes SET consumed_at = $2 WHERE id = $1")
                .bind(row.id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            CodeCheck::Accepted
        } else {
            sqlx::query("UPDATE verification_codes SET attempts = $2 WHERE id = $1")
                .bind(row.id)
                .bind(row.attempts + 1)
                .execute(&mut *tx)
                .await?;
            CodeCheck::Rejected
        };

        tx.commit().await?;

        Ok(outcome)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
