//! Checkout: turn a cart (or an inline item list) into an order.
//!
//! Stock and prices are read under row locks in the same transaction that
//! inserts the order, so two customers cannot buy the last unit twice. The
//! payment gateway is called only after that transaction commits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use vitrina_core::{
    AddressId, Email, Money, MoneyError, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
    Phone, ProductId,
};

use crate::db::{self, AddressRepository, OrderRepository, RepositoryError};
use crate::models::cart::MAX_LINE_QUANTITY;
use crate::models::{AddressFields, CurrentUser, NewOrder, NewOrderItem, Product};
use crate::services::yookassa::{YooKassaClient, YooKassaError};

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request itself is wrong. Message is shown to the customer.
    #[error("{0}")]
    Invalid(String),

    /// The referenced saved address does not belong to the customer.
    #[error("address not found")]
    AddressNotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("order total out of range: {0}")]
    Money(#[from] MoneyError),

    /// Gateway refused or failed; the order exists with a failed payment.
    #[error("payment for order {order_id} failed: {source}")]
    Payment {
        order_id: OrderId,
        #[source]
        source: YooKassaError,
    },
}

impl CheckoutError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// One requested line.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Body of `POST /api/checkout`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckoutRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address_id: Option<AddressId>,
    #[serde(default)]
    pub address: Option<AddressFields>,
    #[serde(default)]
    pub items: Option<Vec<CheckoutItem>>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Response of `POST /api/checkout`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_url: Option<String>,
}

/// Where the items come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemSource {
    Request(Vec<(ProductId, i32)>),
    Cart,
}

/// Merge duplicate product lines and check quantities.
///
/// The result is sorted by product ID, matching the lock order.
fn merge_lines(items: &[CheckoutItem]) -> Result<Vec<(ProductId, i32)>, CheckoutError> {
    let mut merged: BTreeMap<ProductId, i32> = BTreeMap::new();
    for item in items {
        if item.quantity < 1 {
            return Err(CheckoutError::invalid("quantity must be at least 1"));
        }
        let entry = merged.entry(item.product_id).or_default();
        *entry = entry.saturating_add(item.quantity);
        if *entry > MAX_LINE_QUANTITY {
            return Err(CheckoutError::invalid(format!(
                "quantity must be at most {MAX_LINE_QUANTITY}"
            )));
        }
    }
    Ok(merged.into_iter().collect())
}

/// Price requested lines against locked product rows.
///
/// # Errors
///
/// Returns [`CheckoutError::Invalid`] naming the first product that is
/// missing, unpublished, or short on stock.
fn price_lines(
    products: &[Product],
    lines: &[(ProductId, i32)],
) -> Result<(Vec<NewOrderItem>, Money), CheckoutError> {
    let mut items = Vec::with_capacity(lines.len());
    let mut total = Money::ZERO;

    for &(product_id, quantity) in lines {
        let product = products
            .iter()
            .find(|p| p.id == product_id && p.is_published)
            .ok_or_else(|| CheckoutError::invalid(format!("product {product_id} is not available")))?;

        if product.stock < quantity {
            return Err(CheckoutError::invalid(format!(
                "only {} left of \"{}\"",
                product.stock.max(0),
                product.name
            )));
        }

        let unit_price = product.current_price();
        let quantity_units = u32::try_from(quantity).map_err(|_| MoneyError::Overflow)?;
        total = total.plus(unit_price.times(quantity_units)?)?;

        items.push(NewOrderItem {
            product_id,
            product_name: product.name.clone(),
            unit_price,
            quantity,
        });
    }

    Ok((items, total))
}

/// Validated contact and delivery details, ready to snapshot into an order.
struct Recipient {
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    shipping_address_id: Option<AddressId>,
    delivery_address: String,
}

async fn resolve_recipient(
    pool: &PgPool,
    user: Option<CurrentUser>,
    request: &CheckoutRequest,
) -> Result<Recipient, CheckoutError> {
    let customer_name = request.name.trim().to_owned();
    if customer_name.is_empty() {
        return Err(CheckoutError::invalid("name is required"));
    }
    let customer_phone = Phone::parse(&request.phone)
        .map_err(|e| CheckoutError::invalid(e.to_string()))?
        .as_str()
        .to_owned();
    let customer_email = match request.email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            Email::parse(raw)
                .map_err(|e| CheckoutError::invalid(e.to_string()))?
                .into_inner(),
        ),
    };

    let (shipping_address_id, delivery_address) = match (request.address_id, &request.address) {
        (Some(_), Some(_)) => {
            return Err(CheckoutError::invalid("give either addressId or address, not both"));
        }
        (Some(address_id), None) => {
            let Some(user) = user else {
                return Err(CheckoutError::invalid("log in to use a saved address"));
            };
            let address = AddressRepository::new(pool)
                .get(user.id, address_id)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => CheckoutError::AddressNotFound,
                    other => other.into(),
                })?;
            (Some(address.id), address.one_line())
        }
        (None, Some(fields)) => {
            fields.validate().map_err(CheckoutError::Invalid)?;
            (None, fields.one_line())
        }
        (None, None) => return Err(CheckoutError::invalid("delivery address is required")),
    };

    Ok(Recipient {
        customer_name,
        customer_phone,
        customer_email,
        shipping_address_id,
        delivery_address,
    })
}

fn item_source(user: Option<CurrentUser>, request: &CheckoutRequest) -> Result<ItemSource, CheckoutError> {
    match (&request.items, user) {
        (Some(items), _) if !items.is_empty() => Ok(ItemSource::Request(merge_lines(items)?)),
        (_, Some(_)) => Ok(ItemSource::Cart),
        (_, None) => Err(CheckoutError::invalid("items are required")),
    }
}

/// Create the order and, for online payment, the gateway payment.
///
/// # Errors
///
/// See [`CheckoutError`]. On [`CheckoutError::Payment`] the order has been
/// committed with `payment_status = failed`.
#[tracing::instrument(skip(pool, gateway, request), fields(user_id = ?user.map(|u| u.id)))]
pub async fn place_order(
    pool: &PgPool,
    gateway: Option<&YooKassaClient>,
    user: Option<CurrentUser>,
    request: &CheckoutRequest,
) -> Result<PlacedOrder, CheckoutError> {
    if request.payment_method == PaymentMethod::Online && gateway.is_none() {
        return Err(CheckoutError::invalid("online payment is not available"));
    }

    let source = item_source(user, request)?;
    let recipient = resolve_recipient(pool, user, request).await?;

    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;

    let lines = match &source {
        ItemSource::Request(lines) => lines.clone(),
        ItemSource::Cart => {
            let Some(user) = user else {
                return Err(CheckoutError::invalid("items are required"));
            };
            let lines = db::cart::cart_quantities(&mut tx, user.id).await?;
            if lines.is_empty() {
                return Err(CheckoutError::invalid("cart is empty"));
            }
            lines
        }
    };

    let ids: Vec<ProductId> = lines.iter().map(|(id, _)| *id).collect();
    let products = db::catalog::lock_products(&mut tx, &ids).await?;
    let (items, total) = price_lines(&products, &lines)?;

    for item in &items {
        db::catalog::take_stock(&mut tx, item.product_id, item.quantity).await?;
    }

    let order = NewOrder {
        user_id: user.map(|u| u.id),
        shipping_address_id: recipient.shipping_address_id,
        delivery_address: recipient.delivery_address,
        customer_name: recipient.customer_name,
        customer_phone: recipient.customer_phone,
        customer_email: recipient.customer_email,
        comment: request
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned),
        total,
        payment_method: request.payment_method,
        items,
    };
    let order_id = db::orders::insert_order(&mut tx, &order).await?;

    if let (ItemSource::Cart, Some(user)) = (&source, user) {
        db::cart::clear_cart(&mut tx, user.id).await?;
    }

    tx.commit().await.map_err(RepositoryError::from)?;

    tracing::info!(
        order_id = %order_id,
        total = %total,
        payment_method = order.payment_method.as_str(),
        "Order placed"
    );

    let mut placed = PlacedOrder {
        order_id,
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        total,
        confirmation_url: None,
    };

    if let (PaymentMethod::Online, Some(gateway)) = (order.payment_method, gateway) {
        placed.confirmation_url = Some(start_payment(pool, gateway, order_id, total).await?);
    }

    Ok(placed)
}

/// Create the gateway payment for a committed order and return the URL the
/// customer is redirected to.
async fn start_payment(
    pool: &PgPool,
    gateway: &YooKassaClient,
    order_id: OrderId,
    total: Money,
) -> Result<String, CheckoutError> {
    let orders = OrderRepository::new(pool);

    let payment = gateway.create_payment(order_id, total).await.and_then(|payment| {
        payment
            .confirmation_url()
            .map(str::to_owned)
            .map(|url| (payment.id.clone(), url))
            .ok_or(YooKassaError::MissingConfirmation(payment.id))
    });

    match payment {
        Ok((payment_id, url)) => {
            orders.set_payment_id(order_id, &payment_id).await?;
            tracing::info!(order_id = %order_id, payment_id = %payment_id, "Payment created");
            Ok(url)
        }
        Err(source) => {
            tracing::warn!(order_id = %order_id, error = %source, "Payment creation failed");
            orders.set_payment_status(order_id, PaymentStatus::Failed).await?;
            Err(CheckoutError::Payment { order_id, source })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(id: i32, price: u32, sale: Option<u32>, stock: i32, published: bool) -> Product {
        Product {
            id: ProductId::new(id),
            slug: format!("p-{id}"),
            name: format!("Product {id}"),
            description: String::new(),
            category_id: None,
            price: Money::rubles(price),
            sale_price: sale.map(Money::rubles),
            stock,
            is_published: published,
            images: Vec::new(),
            vendor: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(id: i32, quantity: i32) -> CheckoutItem {
        CheckoutItem {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_merge_lines_sums_duplicates_sorted() {
        let lines = merge_lines(&[item(5, 1), item(2, 3), item(5, 2)]).unwrap();
        assert_eq!(
            lines,
            vec![(ProductId::new(2), 3), (ProductId::new(5), 3)]
        );
    }

    #[test]
    fn test_merge_lines_rejects_bad_quantities() {
        assert!(merge_lines(&[item(1, 0)]).is_err());
        assert!(merge_lines(&[item(1, 60), item(1, 40)]).is_err());
    }

    #[test]
    fn test_price_lines_uses_sale_price() {
        let products = [product(1, 1000, Some(800), 5, true), product(2, 250, None, 5, true)];
        let lines = [(ProductId::new(1), 2), (ProductId::new(2), 1)];
        let (items, total) = price_lines(&products, &lines).unwrap();
        assert_eq!(total, Money::rubles(1850));
        assert_eq!(items[0].unit_price, Money::rubles(800));
        assert_eq!(items[0].product_name, "Product 1");
    }

    #[test]
    fn test_price_lines_rejects_short_stock() {
        let products = [product(1, 100, None, 1, true)];
        let err = price_lines(&products, &[(ProductId::new(1), 2)]).unwrap_err();
        assert_eq!(err.to_string(), "only 1 left of \"Product 1\"");
    }

    #[test]
    fn test_price_lines_rejects_unpublished_and_missing() {
        let products = [product(1, 100, None, 10, false)];
        assert!(price_lines(&products, &[(ProductId::new(1), 1)]).is_err());
        assert!(price_lines(&products, &[(ProductId::new(2), 1)]).is_err());
    }

    #[test]
    fn test_guest_must_send_items() {
        let request: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "name": "Анна",
            "phone": "+79161234567",
        }))
        .unwrap();
        assert!(item_source(None, &request).is_err());

        let user = CurrentUser {
            id: vitrina_core::UserId::new(1),
            role: vitrina_core::UserRole::User,
        };
        assert_eq!(item_source(Some(user), &request).unwrap(), ItemSource::Cart);
    }

    #[test]
    fn test_request_defaults_to_online_payment() {
        let request: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "name": "Анна",
            "phone": "+79161234567",
            "items": [{ "productId": 1, "quantity": 2 }],
        }))
        .unwrap();
        assert_eq!(request.payment_method, PaymentMethod::Online);
    }

    #[test]
    fn test_placed_order_omits_missing_confirmation() {
        let placed = PlacedOrder {
            order_id: OrderId::new(7),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total: Money::rubles(100),
            confirmation_url: None,
        };
        let json = serde_json::to_value(&placed).unwrap();
        assert_eq!(json["orderId"], 7);
        assert!(json.get("confirmationUrl").is_none());
    }
}
