//! Admin tracking pixels and shop settings.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, put},
};
use serde_json::{Map, Value};
use tracing::instrument;

use vitrina_core::TrackingPixelId;

use crate::db::{SettingsRepository, TrackingPixelRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::models::{NewTrackingPixel, SettingKey, TrackingPixel, TrackingPixelPatch};
use crate::routes::not_found;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tracking-pixels", get(list_pixels).post(create_pixel))
        .route("/tracking-pixels/{id}", patch(update_pixel).delete(delete_pixel))
        .route("/settings", get(list_settings))
        .route("/settings/{key}", put(set_setting))
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn list_pixels(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<TrackingPixel>>> {
    Ok(Json(TrackingPixelRepository::new(state.pool()).list(false).await?))
}

#[instrument(skip(state, body), fields(admin_id = %admin.id))]
async fn create_pixel(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<NewTrackingPixel>,
) -> Result<(StatusCode, Json<TrackingPixel>)> {
    body.validate().map_err(AppError::Validation)?;
    let pixel = TrackingPixelRepository::new(state.pool()).create(&body).await?;
    Ok((StatusCode::CREATED, Json(pixel)))
}

#[instrument(skip(state, body), fields(admin_id = %admin.id))]
async fn update_pixel(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<TrackingPixelId>,
    Json(body): Json<TrackingPixelPatch>,
) -> Result<Json<TrackingPixel>> {
    body.validate().map_err(AppError::Validation)?;
    TrackingPixelRepository::new(state.pool())
        .update(id, &body)
        .await
        .map(Json)
        .map_err(|e| not_found(e, "Tracking pixel"))
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn delete_pixel(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<TrackingPixelId>,
) -> Result<StatusCode> {
    TrackingPixelRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found(e, "Tracking pixel"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn list_settings(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Map<String, Value>>> {
    Ok(Json(SettingsRepository::new(state.pool()).all().await?))
}

#[instrument(skip(state, value), fields(admin_id = %admin.id))]
async fn set_setting(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<Map<String, Value>>> {
    let key = key.parse::<SettingKey>().map_err(AppError::Validation)?;
    key.validate(&value).map_err(AppError::Validation)?;

    let settings = SettingsRepository::new(state.pool());
    settings.set(key, &value).await?;
    tracing::info!(key = key.as_str(), "Setting updated");
    Ok(Json(settings.all().await?))
}
