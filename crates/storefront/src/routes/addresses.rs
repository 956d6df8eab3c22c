//! Saved shipping addresses of the logged-in user.
//!
//! Every mutation goes through [`AddressRepository`], which keeps exactly one
//! default address per non-empty address book.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use vitrina_core::AddressId;

use crate::db::AddressRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressFields, AddressPatch};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/addresses", get(list).post(create))
        .route("/api/addresses/{id}", get(show).patch(update).delete(remove))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn list(RequireAuth(user): RequireAuth, State(state): State<AppState>) -> Result<Json<Vec<Address>>> {
    Ok(Json(AddressRepository::new(state.pool()).list(user.id).await?))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    AddressRepository::new(state.pool())
        .get(user.id, id)
        .await
        .map(Json)
        .map_err(|e| super::not_found(e, "Address"))
}

#[instrument(skip(state, body), fields(user_id = %user.id))]
async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<AddressFields>,
) -> Result<(StatusCode, Json<Address>)> {
    body.validate().map_err(AppError::Validation)?;
    let address = AddressRepository::new(state.pool())
        .create(user.id, &body)
        .await
        .map_err(|e| super::not_found(e, "User"))?;
    Ok((StatusCode::CREATED, Json(address)))
}

#[instrument(skip(state, patch), fields(user_id = %user.id))]
async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
    Json(patch): Json<AddressPatch>,
) -> Result<Json<Address>> {
    patch.validate().map_err(AppError::Validation)?;
    AddressRepository::new(state.pool())
        .update(user.id, id, &patch)
        .await
        .map(Json)
        .map_err(|e| super::not_found(e, "Address"))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .delete(user.id, id)
        .await
        .map_err(|e| super::not_found(e, "Address"))?;
    Ok(StatusCode::NO_CONTENT)
}
