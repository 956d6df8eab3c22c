//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vitrina_core::{Email, Phone, UserId, UserRole};

/// A shop account.
///
/// Accounts are created on first successful code verification, so at least
/// one of `phone` and `email` is always set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub phone: Option<Phone>,
    pub email: Option<Email>,
    pub name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
