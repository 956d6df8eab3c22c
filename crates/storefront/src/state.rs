//! Application state shared across handlers.

use std::sync::Arc;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::VitrinaConfig;
use crate::services::email::EmailService;
use crate::services::sms::{SmsClient, SmsError};
use crate::services::uploads::Uploader;
use crate::services::verification::CodeSender;
use crate::services::yookassa::{YooKassaClient, YooKassaError};

/// Error building the shared clients at startup.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment client: {0}")]
    YooKassa(#[from] YooKassaError),
    #[error("sms client: {0}")]
    Sms(#[from] SmsError),
    #[error("smtp transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Generated XML documents kept in the document cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    Feed,
    Sitemap,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: VitrinaConfig,
    pool: PgPool,
    yookassa: Option<YooKassaClient>,
    codes: CodeSender,
    uploader: Uploader,
    documents: Cache<Document, Arc<str>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Payment, SMS and email clients are built only when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured client cannot be built.
    pub fn new(config: VitrinaConfig, pool: PgPool) -> Result<Self, StateError> {
        let yookassa = config.yookassa.as_ref().map(YooKassaClient::new).transpose()?;
        let sms = config.sms.as_ref().map(SmsClient::new).transpose()?;
        let email = config
            .email
            .as_ref()
            .map(|email| EmailService::new(email, &config.feed.shop_name))
            .transpose()?;

        if yookassa.is_none() {
            tracing::warn!("YooKassa is not configured, online payment is disabled");
        }

        let uploader = Uploader::from_config(&config);
        let documents = Cache::builder()
            .max_capacity(4)
            .time_to_live(config.feed.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                yookassa,
                codes: CodeSender::new(sms, email),
                uploader,
                documents,
            }),
        })
    }

    /// Get a reference to the shop configuration.
    #[must_use]
    pub fn config(&self) -> &VitrinaConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The payment gateway client, if configured.
    #[must_use]
    pub fn yookassa(&self) -> Option<&YooKassaClient> {
        self.inner.yookassa.as_ref()
    }

    /// Login code delivery.
    #[must_use]
    pub fn codes(&self) -> &CodeSender {
        &self.inner.codes
    }

    /// Admin image uploads.
    #[must_use]
    pub fn uploader(&self) -> &Uploader {
        &self.inner.uploader
    }

    /// Cache of rendered feed and sitemap documents.
    #[must_use]
    pub fn documents(&self) -> &Cache<Document, Arc<str>> {
        &self.inner.documents
    }
}
