//! Public site configuration: tracking pixels and shop settings.

use axum::{Router, extract::State, routing::get};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::db::{SettingsRepository, TrackingPixelRepository};
use crate::error::Result;
use crate::extract::Json;
use crate::models::TrackingPixel;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tracking-pixels", get(tracking_pixels))
        .route("/api/settings", get(settings))
}

/// Enabled pixels only.
#[instrument(skip(state))]
async fn tracking_pixels(State(state): State<AppState>) -> Result<Json<Vec<TrackingPixel>>> {
    Ok(Json(TrackingPixelRepository::new(state.pool()).list(true).await?))
}

#[instrument(skip(state))]
async fn settings(State(state): State<AppState>) -> Result<Json<Map<String, Value>>> {
    Ok(Json(SettingsRepository::new(state.pool()).all().await?))
}
