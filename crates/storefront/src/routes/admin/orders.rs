//! Order administration.
//!
//! ```text
//! GET    /api/admin/orders?status=&page=&per_page=
//! GET    /api/admin/orders/{id}
//! PATCH  /api/admin/orders/{id}          {status}
//! PATCH  /api/admin/orders/{id}/status   {status}
//! DELETE /api/admin/orders/{id}
//! ```

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use vitrina_core::{OrderId, OrderStatus};

use crate::db::{OrderListFilter, OrderRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAdmin;
use crate::models::{Order, OrderSummary};
use crate::routes::Page;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list))
        .route("/orders/{id}", get(show).patch(update_status).delete(remove))
        .route("/orders/{id}/status", patch(update_status))
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdate {
    pub status: String,
}

/// Parse an order status from a request, rejecting unknown values with 400.
fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.trim().parse::<OrderStatus>().map_err(|_| {
        AppError::Validation(format!(
            "Invalid status: {raw}. Allowed: {}",
            OrderStatus::ALL.map(|s| s.as_str()).join(", ")
        ))
    })
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn list(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Page<OrderSummary>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_status)
        .transpose()?;
    let filter = OrderListFilter {
        status,
        page: query.page,
        per_page: query.per_page,
    };
    let (items, total) = OrderRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Page {
        items,
        total,
        page: filter.page.unwrap_or(1).max(1),
        per_page: filter.limit(),
    }))
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await
        .map(Json)
        .map_err(|e| crate::routes::not_found(e, "Order"))
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let status = parse_status(&body.status)?;
    OrderRepository::new(state.pool())
        .update_status(id, status)
        .await
        .map(Json)
        .map_err(|e| crate::routes::not_found(e, "Order"))
}

#[instrument(skip(state), fields(admin_id = %admin.id))]
async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<StatusCode> {
    OrderRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| crate::routes::not_found(e, "Order"))?;
    tracing::info!(order_id = %id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_accepts_every_status() {
        for status in OrderStatus::ALL {
            assert_eq!(parse_status(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_parse_status_rejects_unknown_with_400() {
        let err = parse_status("LOST").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Invalid status: LOST"));
    }
}
