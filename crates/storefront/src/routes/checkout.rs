//! Checkout, the payment webhook, and the customer's own orders.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::map_response,
    routing::{get, post},
};
use tracing::instrument;

use vitrina_core::{OrderId, PaymentStatus};

use crate::db::OrderRepository;
use crate::error::{Result, add_breadcrumb};
use crate::extract::{Json, Path};
use crate::middleware::{OptionalAuth, RequireAuth, api_rate_limiter, rate_limit_envelope};
use crate::models::{Order, OrderSummary};
use crate::services::checkout::{self, CheckoutRequest, PlacedOrder};
use crate::services::yookassa::Notification;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    let limited = Router::new()
        .route("/api/checkout", post(place_order))
        .route("/api/payments/yookassa/webhook", post(payment_webhook))
        .layer(api_rate_limiter())
        .layer(map_response(rate_limit_envelope));

    Router::new()
        .merge(limited)
        .route("/api/orders", get(my_orders))
        .route("/api/orders/{id}", get(my_order))
}

#[instrument(skip(state, request))]
async fn place_order(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let placed = checkout::place_order(state.pool(), state.yookassa(), user, &request).await?;

    let order_id = placed.order_id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));

    Ok((StatusCode::CREATED, Json(placed)))
}

/// `YooKassa` notification endpoint.
///
/// The body only tells us which payment changed. Its state is fetched back
/// from the API so a forged notification cannot mark an order paid.
#[instrument(skip(state, notification), fields(payment_id = %notification.object.id, event = %notification.event))]
async fn payment_webhook(
    State(state): State<AppState>,
    Json(notification): Json<Notification>,
) -> Result<StatusCode> {
    let Some(gateway) = state.yookassa() else {
        tracing::warn!("Payment notification received but YooKassa is not configured");
        return Ok(StatusCode::OK);
    };

    let payment = match gateway.get_payment(&notification.object.id).await {
        Ok(payment) => payment,
        Err(err) if err.is_not_found() => {
            tracing::warn!("Notification for a payment the gateway does not know, ignored");
            return Ok(StatusCode::OK);
        }
        Err(err) => return Err(err.into()),
    };
    let status = PaymentStatus::from(payment.status);
    if status == PaymentStatus::Pending {
        return Ok(StatusCode::OK);
    }

    match OrderRepository::new(state.pool())
        .record_payment(&payment.id, status)
        .await?
    {
        Some(order_id) => {
            tracing::info!(order_id = %order_id, status = status.as_str(), "Payment status recorded");
        }
        None => {
            tracing::warn!(payment_id = %payment.id, "Notification for unknown payment ignored");
        }
    }

    Ok(StatusCode::OK)
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn my_orders(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderSummary>>> {
    Ok(Json(OrderRepository::new(state.pool()).list_for_user(user.id).await?))
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn my_order(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get_for_user(user.id, id)
        .await
        .map(Json)
        .map_err(|e| super::not_found(e, "Order"))
}
