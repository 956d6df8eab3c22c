//! Generated XML documents: the YML catalog feed and the sitemap.
//!
//! Both are cached in memory for `FEED_CACHE_TTL_SECS` and served with a
//! matching `Cache-Control` header.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use tracing::instrument;

use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::services::feed::{FeedError, ShopInfo, render_feed};
use crate::services::sitemap::render_sitemap;
use crate::state::{AppState, Document};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed.yml", get(feed))
        .route("/yandex-feed.xml", get(feed))
        .route("/sitemap.xml", get(sitemap))
}

fn xml_response(state: &AppState, body: &Arc<str>) -> Response {
    let max_age = state.config().feed.cache_ttl.as_secs();
    (
        [
            (header::CONTENT_TYPE, "application/xml; charset=utf-8".to_owned()),
            (header::CACHE_CONTROL, format!("public, max-age={max_age}")),
        ],
        body.to_string(),
    )
        .into_response()
}

/// The document cache hands back a shared error, so it is described rather
/// than moved into the response.
fn cache_error(err: &FeedError) -> AppError {
    match err {
        FeedError::Database(err) => AppError::Unexpected(format!("reading catalog: {err}")),
        FeedError::Xml(err) => AppError::Unexpected(format!("writing document: {err}")),
    }
}

async fn build_feed(state: &AppState) -> std::result::Result<Arc<str>, FeedError> {
    let config = state.config();
    let shop = ShopInfo {
        name: &config.feed.shop_name,
        company: &config.feed.company,
        base_url: config.base_url.trim_end_matches('/'),
    };
    let categories = CategoryRepository::new(state.pool()).list().await?;
    let products = ProductRepository::new(state.pool()).stream_published();

    let document = render_feed(&shop, &categories, products, Utc::now()).await?;
    tracing::info!(bytes = document.len(), "Catalog feed rendered");
    Ok(Arc::from(document))
}

async fn build_sitemap(state: &AppState) -> std::result::Result<Arc<str>, FeedError> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    let products = ProductRepository::new(state.pool()).published_slugs().await?;
    let document = render_sitemap(
        state.config().base_url.trim_end_matches('/'),
        &categories,
        &products,
    )?;
    Ok(Arc::from(document))
}

#[instrument(skip(state))]
async fn feed(State(state): State<AppState>) -> Result<Response> {
    let body = state
        .documents()
        .try_get_with(Document::Feed, build_feed(&state))
        .await
        .map_err(|e| cache_error(&e))?;
    Ok(xml_response(&state, &body))
}

#[instrument(skip(state))]
async fn sitemap(State(state): State<AppState>) -> Result<Response> {
    let body = state
        .documents()
        .try_get_with(Document::Sitemap, build_sitemap(&state))
        .await
        .map_err(|e| cache_error(&e))?;
    Ok(xml_response(&state, &body))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::db::RepositoryError;

    #[test]
    fn test_feed_read_failure_is_server_error() {
        let err = Arc::new(FeedError::Database(RepositoryError::DataCorruption(
            "bad price".to_owned(),
        )));
        let app_err = cache_error(&err);
        assert_eq!(app_err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(app_err.to_string().contains("reading catalog"));
    }
}
