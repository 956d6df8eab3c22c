//! Vitrina shop server library.
//!
//! The public storefront API and the admin API share one axum application.
//! The binary in `main.rs` wires it to `PostgreSQL` sessions and a listener;
//! tests build the same router over in-memory sessions.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, body::Body, http::Request, middleware::from_fn};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;

/// Build the full application: API routes, uploaded files under the public
/// prefix, sessions, request IDs and request tracing.
pub fn app<Store>(state: AppState, session_layer: SessionManagerLayer<Store>) -> Router
where
    Store: SessionStore + Clone,
{
    let uploads = ServeDir::new(state.uploader().dir());
    let upload_prefix = state.config().uploads.public_prefix.clone();

    Router::new()
        .merge(routes::routes(state.config()))
        .nest_service(&upload_prefix, uploads)
        .layer(session_layer)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
