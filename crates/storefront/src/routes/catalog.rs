//! Public catalog: categories and published products.

use axum::{Router, extract::State, routing::get};
use serde::Deserialize;
use tracing::instrument;

use crate::db::{CategoryRepository, ProductFilter, ProductRepository};
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::models::{Category, Product};
use crate::state::AppState;

use super::Page;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(categories))
        .route("/api/products", get(products))
        .route("/api/products/{slug}", get(product))
}

/// Query string of the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        Self {
            category: query.category.filter(|c| !c.is_empty()),
            query: query.q.filter(|q| !q.trim().is_empty()),
            page: query.page,
            per_page: query.per_page,
        }
    }
}

#[instrument(skip(state))]
async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

#[instrument(skip(state))]
async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<Product>>> {
    let filter = ProductFilter::from(query);
    let (items, total) = ProductRepository::new(state.pool())
        .list_published(&filter)
        .await?;
    Ok(Json(Page {
        items,
        total,
        page: filter.page.unwrap_or(1).max(1),
        per_page: filter.limit(),
    }))
}

#[instrument(skip(state))]
async fn product(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get_published_by_slug(&slug)
        .await
        .map(Json)
        .map_err(|e| super::not_found(e, "Product"))
}
