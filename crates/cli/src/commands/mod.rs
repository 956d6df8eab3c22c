//! CLI command implementations.

pub mod migrate;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while connecting to the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using `VITRINA_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// Loads `.env` first so the CLI sees the same settings as the server.
pub async fn connect() -> Result<PgPool, ConnectError> {
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("VITRINA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| ConnectError::MissingEnvVar("VITRINA_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = vitrina_storefront::db::create_pool(&SecretString::from(database_url)).await?;
    Ok(pool)
}
