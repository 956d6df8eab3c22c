//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Promote a customer to admin (they must have logged in once)
//! vitrina-cli user set-role --phone +79991234567 --role ADMIN
//!
//! # Demote by email
//! vitrina-cli user set-role --email owner@example.com --role USER
//! ```
//!
//! Roles are copied into the session at login, so the change applies from
//! the user's next login.

use thiserror::Error;
use vitrina_core::{Email, EmailError, Phone, PhoneError, UnknownVariant, UserRole};
use vitrina_storefront::db::{Contact, RepositoryError, UserRepository};

use super::{ConnectError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Could not reach the database.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: USER, ADMIN")]
    InvalidRole(#[from] UnknownVariant),

    /// Invalid phone number.
    #[error("Invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Neither `--phone` nor `--email` given.
    #[error("Pass --phone or --email")]
    MissingContact,

    /// No user with that phone or email.
    #[error("No user with {0}")]
    NotFound(String),

    /// Database error.
    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Parse the contact given on the command line.
pub fn parse_contact(phone: Option<&str>, email: Option<&str>) -> Result<Contact, UserError> {
    match (phone, email) {
        (Some(phone), _) => Ok(Contact::Phone(Phone::parse(phone)?)),
        (None, Some(email)) => Ok(Contact::Email(Email::parse(email)?)),
        (None, None) => Err(UserError::MissingContact),
    }
}

/// Change the role of an existing user.
///
/// # Errors
///
/// Returns `UserError` if the arguments are invalid, the user does not
/// exist, or the database is unreachable.
pub async fn set_role(contact: &Contact, role: &str) -> Result<(), UserError> {
    let role = role.parse::<UserRole>()?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(contact, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => UserError::NotFound(contact.masked()),
            other => UserError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, role = role.as_str(), "Role updated");
    pool.close().await;
    Ok(())
}
