//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`, and every failure reaches the client as
//! `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::checkout::CheckoutError;
use crate::services::uploads::UploadError;
use crate::services::yookassa::YooKassaError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// No logged-in session.
    #[error("Authentication required")]
    Unauthenticated,

    /// Logged in, but the role does not allow this.
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Request failed validation. The message is shown to the client.
    #[error("{0}")]
    Validation(String),

    /// Payment gateway or other upstream service failed.
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Anything else that should not happen.
    #[error("Internal error: {0}")]
    Unexpected(String),

    /// Rate limited.
    #[error("Too many requests")]
    RateLimited,
}

impl AppError {
    /// Shorthand for [`AppError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Resource"),
            RepositoryError::Conflict(message) => Self::Validation(message),
            other => Self::Database(other),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(_) => Self::Unexpected(err.to_string()),
            rejected => Self::Validation(rejected.to_string()),
        }
    }
}

impl From<YooKassaError> for AppError {
    fn from(err: YooKassaError) -> Self {
        Self::UpstreamFailure(err.to_string())
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Invalid(message) => Self::Validation(message),
            CheckoutError::AddressNotFound => Self::NotFound("Address"),
            CheckoutError::Repository(err) => err.into(),
            CheckoutError::Money(err) => Self::Validation(err.to_string()),
            payment @ CheckoutError::Payment { .. } => Self::UpstreamFailure(payment.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Unexpected(_) => "Internal server error".to_owned(),
            Self::UpstreamFailure(_) => "Payment service is unavailable".to_owned(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order created", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(err: AppError) -> serde_json::Value {
        let body = err.into_response().into_body().collect().await.unwrap();
        serde_json::from_slice(&body.to_bytes()).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        assert_eq!(AppError::NotFound("Order").to_string(), "Order not found");
        assert_eq!(
            AppError::validation("Invalid status: LOST").to_string(),
            "Invalid status: LOST"
        );
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AppError::NotFound("Order")), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(AppError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::UpstreamFailure("timeout".to_owned())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Unexpected("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_repository_errors_map_to_client_statuses() {
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("product already exists".to_owned()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad enum".to_owned()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_checkout_errors_map_to_client_statuses() {
        assert_eq!(
            get_status(CheckoutError::Invalid("cart is empty".to_owned()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::AddressNotFound.into()),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_envelope_hides_internal_details() {
        let body = body_json(AppError::Database(RepositoryError::DataCorruption(
            "invalid order status: \"LOST\"".to_owned(),
        )))
        .await;
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_envelope_carries_validation_message() {
        let body = body_json(AppError::validation("File too large")).await;
        assert_eq!(body, json!({ "error": "File too large" }));
    }
}
