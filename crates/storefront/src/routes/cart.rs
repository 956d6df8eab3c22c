//! Cart and wishlist of the logged-in user.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use serde::Deserialize;
use tracing::instrument;

use vitrina_core::ProductId;

use crate::db::{CartRepository, WishlistRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::cart::MAX_LINE_QUANTITY;
use crate::models::{Cart, WishlistEntry};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(show).delete(clear))
        .route("/api/cart/items", post(add))
        .route("/api/cart/items/{product_id}", patch(set_quantity).delete(remove))
        .route("/api/wishlist", get(wishlist).post(add_to_wishlist))
        .route("/api/wishlist/{product_id}", delete(remove_from_wishlist))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddItem {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetQuantity {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WishlistItem {
    pub product_id: ProductId,
}

fn check_quantity(quantity: i32) -> Result<()> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}"
        )))
    }
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn show(RequireAuth(user): RequireAuth, State(state): State<AppState>) -> Result<Json<Cart>> {
    Ok(Json(CartRepository::new(state.pool()).get(user.id).await?))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn add(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<AddItem>,
) -> Result<Json<Cart>> {
    check_quantity(body.quantity)?;
    let carts = CartRepository::new(state.pool());
    carts
        .add(user.id, body.product_id, body.quantity)
        .await
        .map_err(|e| super::not_found(e, "Product"))?;
    Ok(Json(carts.get(user.id).await?))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn set_quantity(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
    Json(body): Json<SetQuantity>,
) -> Result<Json<Cart>> {
    check_quantity(body.quantity)?;
    let carts = CartRepository::new(state.pool());
    carts
        .set_quantity(user.id, product_id, body.quantity)
        .await
        .map_err(|e| super::not_found(e, "Cart item"))?;
    Ok(Json(carts.get(user.id).await?))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn remove(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Cart>> {
    let carts = CartRepository::new(state.pool());
    carts
        .remove(user.id, product_id)
        .await
        .map_err(|e| super::not_found(e, "Cart item"))?;
    Ok(Json(carts.get(user.id).await?))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn clear(RequireAuth(user): RequireAuth, State(state): State<AppState>) -> Result<StatusCode> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn wishlist(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<WishlistEntry>>> {
    Ok(Json(WishlistRepository::new(state.pool()).list(user.id).await?))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn add_to_wishlist(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<WishlistItem>,
) -> Result<Json<Vec<WishlistEntry>>> {
    let wishlist = WishlistRepository::new(state.pool());
    wishlist
        .add(user.id, body.product_id)
        .await
        .map_err(|e| super::not_found(e, "Product"))?;
    Ok(Json(wishlist.list(user.id).await?))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn remove_from_wishlist(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await
        .map_err(|e| super::not_found(e, "Wishlist item"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_bounds() {
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(check_quantity(0).is_err());
        assert!(check_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }
}
