//! Admin product and category management.
//!
//! Catalog changes drop the cached feed and sitemap so the next request
//! renders fresh documents.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use tracing::instrument;

use vitrina_core::{CategoryId, ProductId};

use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAdmin;
use crate::models::{Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch};
use crate::routes::not_found;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", patch(update_product).get(show_product).delete(delete_product))
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}", patch(update_category).delete(delete_category))
}

fn catalog_changed(state: &AppState) {
    state.documents().invalidate_all();
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn list_products(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(ProductRepository::new(state.pool()).list_all().await?))
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn show_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await
        .map(Json)
        .map_err(|e| not_found(e, "Product"))
}

#[instrument(skip(state, body), fields(admin_id = %admin.id))]
async fn create_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    body.validate().map_err(AppError::Validation)?;
    let product = ProductRepository::new(state.pool()).create(&body).await?;
    catalog_changed(&state);
    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, body), fields(admin_id = %admin.id))]
async fn update_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductPatch>,
) -> Result<Json<Product>> {
    body.validate().map_err(AppError::Validation)?;
    let product = ProductRepository::new(state.pool())
        .update(id, &body)
        .await
        .map_err(|e| not_found(e, "Product"))?;
    catalog_changed(&state);
    Ok(Json(product))
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn delete_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found(e, "Product"))?;
    catalog_changed(&state);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn list_categories(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

#[instrument(skip(state, body), fields(admin_id = %admin.id))]
async fn create_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>)> {
    body.validate().map_err(AppError::Validation)?;
    let category = CategoryRepository::new(state.pool()).create(&body).await?;
    catalog_changed(&state);
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(state, body), fields(admin_id = %admin.id))]
async fn update_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(body): Json<CategoryPatch>,
) -> Result<Json<Category>> {
    body.validate(id).map_err(AppError::Validation)?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &body)
        .await
        .map_err(|e| not_found(e, "Category"))?;
    catalog_changed(&state);
    Ok(Json(category))
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn delete_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| not_found(e, "Category"))?;
    catalog_changed(&state);
    Ok(StatusCode::NO_CONTENT)
}
