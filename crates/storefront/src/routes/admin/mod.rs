//! Admin API under `/api/admin`.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin):
//! no session is 401, a non-admin session is 403.

pub mod catalog;
pub mod orders;
pub mod site;
pub mod uploads;

use axum::Router;

use crate::state::AppState;

/// Build the admin router, to be nested at `/api/admin`.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(orders::router())
        .merge(catalog::router())
        .merge(site::router())
        .merge(uploads::router(max_upload_bytes))
}
