//! User repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vitrina_core::{Email, Phone, UserId, UserRole};

use super::{RepositoryError, parse_column};
use crate::models::User;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    phone: Option<String>,
    email: Option<String>,
    name: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let phone = row
            .phone
            .as_deref()
            .map(Phone::parse)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid phone in database: {e}")))?;
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;

        Ok(Self {
            id: UserId::new(row.id),
            phone,
            email,
            name: row.name,
            role: parse_column(&row.role)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// How a user identified themselves at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    Phone(Phone),
    Email(Email),
}

impl Contact {
    /// Channel name stored with verification codes.
    #[must_use]
    pub const fn channel(&self) -> &'static str {
        match self {
            Self::Phone(_) => "sms",
            Self::Email(_) => "email",
        }
    }

    /// Normalized destination string.
    #[must_use]
    pub fn destination(&self) -> &str {
        match self {
            Self::Phone(phone) => phone.as_str(),
            Self::Email(email) => email.as_str(),
        }
    }

    /// Form safe to write to logs.
    #[must_use]
    pub fn masked(&self) -> String {
        match self {
            Self::Phone(phone) => phone.masked(),
            Self::Email(email) => email.masked(),
        }
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row holds invalid data.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, phone, email, name, role, created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Find the user owning `contact`, creating one on first login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_or_create(&self, contact: &Contact) -> Result<User, RepositoryError> {
        // ON CONFLICT needs a column name, not a parameter.
        let sql = match contact {
            Contact::Phone(_) => {
                r"
                INSERT INTO users (phone) VALUES ($1)
                ON CONFLICT (phone) DO UPDATE SET updated_at = NOW()
                RETURNING id, phone, email, name, role, created_at, updated_at
                "
            }
            Contact::Email(_) => {
                r"
                INSERT INTO users (email) VALUES ($1)
                ON CONFLICT (email) DO UPDATE SET updated_at = NOW()
                RETURNING id, phone, email, name, role, created_at, updated_at
                "
            }
        };

        let row = sqlx::query_as::<_, UserRow>(sql)
            .bind(contact.destination())
            .fetch_one(self.pool)
            .await?;

        row.try_into()
    }

    /// Set a user's display name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_name(&self, id: UserId, name: Option<&str>) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, phone, email, name, role, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Change a user's role, looked up by phone or email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that contact.
    pub async fn set_role(&self, contact: &Contact, role: UserRole) -> Result<User, RepositoryError> {
        let sql = match contact {
            Contact::Phone(_) => {
                r"
                UPDATE users SET role = $2, updated_at = NOW()
                WHERE phone = $1
                RETURNING id, phone, email, name, role, created_at, updated_at
                "
            }
            Contact::Email(_) => {
                r"
                UPDATE users SET role = $2, updated_at = NOW()
                WHERE email = $1
                RETURNING id, phone, email, name, role, created_at, updated_at
                "
            }
        };

        let row = sqlx::query_as::<_, UserRow>(sql)
            .bind(contact.destination())
            .bind(role.as_str())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}
