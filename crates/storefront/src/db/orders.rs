//! Order repository.
//!
//! Order deletion is the one multi-table mutation here: items, the shipping
//! address and the order go together or not at all.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use vitrina_core::{
    AddressId, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId,
};

use super::addresses::{delete_from_locked_book, lock_address_book};
use super::{RepositoryError, money_column, parse_column};
use crate::models::{NewOrder, Order, OrderItem, OrderSummary};

/// Default page size for the admin order list.
pub const DEFAULT_ORDERS_PER_PAGE: u32 = 50;
/// Largest admin order page.
pub const MAX_ORDERS_PER_PAGE: u32 = 200;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: Option<i32>,
    shipping_address_id: Option<i32>,
    delivery_address: String,
    status: String,
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    comment: Option<String>,
    total: Decimal,
    payment_method: String,
    payment_id: Option<String>,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: OrderId::new(self.id),
            user_id: self.user_id.map(UserId::new),
            shipping_address_id: self.shipping_address_id.map(AddressId::new),
            delivery_address: self.delivery_address,
            status: parse_column(&self.status)?,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            customer_email: self.customer_email,
            comment: self.comment,
            total: money_column(self.total)?,
            payment_method: parse_column(&self.payment_method)?,
            payment_id: self.payment_id,
            payment_status: parse_column(&self.payment_status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    id: i32,
    user_id: Option<i32>,
    status: String,
    customer_name: String,
    customer_phone: String,
    total: Decimal,
    payment_method: String,
    payment_status: String,
    item_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderSummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: OrderSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: row.user_id.map(UserId::new),
            status: parse_column(&row.status)?,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            total: money_column(row.total)?,
            payment_method: parse_column(&row.payment_method)?,
            payment_status: parse_column(&row.payment_status)?,
            item_count: row.item_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    product_id: Option<i32>,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderItemId::new(row.id),
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            unit_price: money_column(row.unit_price)?,
            quantity: row.quantity,
        })
    }
}

/// Admin order list filter.
#[derive(Debug, Clone, Default)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
    /// 1-based page number.
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderListFilter {
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_ORDERS_PER_PAGE)
            .clamp(1, MAX_ORDERS_PER_PAGE)
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.page
            .unwrap_or(1)
            .max(1)
            .saturating_sub(1)
            .saturating_mul(self.limit())
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Orders for the admin list, newest first, plus the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &OrderListFilter,
    ) -> Result<(Vec<OrderSummary>, i64), RepositoryError> {
        let status = filter.status.map(|s| s.as_str());

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM orders WHERE $1::text IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT o.id, o.user_id, o.status, o.customer_name, o.customer_phone, o.total,
                   o.payment_method, o.payment_status, o.created_at, o.updated_at,
                   (SELECT COALESCE(SUM(i.quantity), 0)::int8
                    FROM order_items i WHERE i.order_id = o.id) AS item_count
            FROM orders o
            WHERE $1::text IS NULL OR o.status = $1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(status)
        .bind(i64::from(filter.limit()))
        .bind(i64::from(filter.offset()))
        .fetch_all(self.pool)
        .await?;

        let orders = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((orders, total))
    }

    /// A user's own orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT o.id, o.user_id, o.status, o.customer_name, o.customer_phone, o.total,
                   o.payment_method, o.payment_status, o.created_at, o.updated_at,
                   (SELECT COALESCE(SUM(i.quantity), 0)::int8
                    FROM order_items i WHERE i.order_id = o.id) AS item_count
            FROM orders o
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// An order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn get(&self, id: OrderId) -> Result<Order, RepositoryError> {
        self.get_where(id, None).await
    }

    /// An order with its items, only if `user_id` placed it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist or
    /// belongs to someone else.
    pub async fn get_for_user(&self, user_id: UserId, id: OrderId) -> Result<Order, RepositoryError> {
        self.get_where(id, Some(user_id)).await
    }

    async fn get_where(&self, id: OrderId, user_id: Option<UserId>) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, shipping_address_id, delivery_address, status,
                   customer_name, customer_phone, customer_email, comment, total,
                   payment_method, payment_id, payment_status, created_at, updated_at
            FROM orders
            WHERE id = $1 AND ($2::int4 IS NULL OR user_id = $2)
            ",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, product_id, product_name, unit_price, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<Vec<_>, _>>()?;

        row.into_order(items)
    }

    /// Set an order's status. Any status may follow any other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_scalar::<_, String>(
            "SELECT status FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, from = %previous, to = %status, "Order status changed");

        self.get(id).await
    }

    /// Delete an order together with its items and its shipping address.
    ///
    /// Runs in one transaction: the order row is locked, items are deleted,
    /// then the shipping address (promoting another default for its owner if
    /// needed), then the order itself. Any failure rolls back all of it.
    ///
    /// The shipping address is deleted even if the customer still uses it
    /// in their address book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Database` if any step fails.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Address mutations lock the owning user first; take the same lock
        // before the order row so the two paths cannot deadlock.
        let owner = sqlx::query_scalar::<_, Option<i32>>(
            r"
            SELECT a.user_id
            FROM orders o
            LEFT JOIN addresses a ON a.id = o.shipping_address_id
            WHERE o.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let book = match owner {
            Some(user_id) => lock_address_book(&mut tx, UserId::new(user_id)).await?,
            None => Vec::new(),
        };

        let shipping_address_id = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT shipping_address_id FROM orders WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .map(AddressId::new);

        let items = sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        // Missing from the locked book means it was deleted before the lock.
        if let Some(address_id) = shipping_address_id
            && book.iter().any(|slot| slot.id == address_id)
        {
            delete_from_locked_book(&mut tx, &book, address_id).await?;
        }

        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %id,
            items_deleted = items,
            address_deleted = ?shipping_address_id,
            "Order deleted"
        );

        Ok(())
    }

    /// Attach a gateway payment ID to an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment_id(&self, id: OrderId, payment_id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(payment_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Set the payment status of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Record a gateway payment outcome by payment ID.
    ///
    /// A successful payment also moves a `PENDING` order to `PROCESSING`.
    /// Returns `None` when no order carries that payment ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_payment(
        &self,
        payment_id: &str,
        status: PaymentStatus,
    ) -> Result<Option<OrderId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE orders SET
                payment_status = $2,
                status = CASE
                    WHEN $2 = 'succeeded' AND status = 'PENDING' THEN 'PROCESSING'
                    ELSE status
                END,
                updated_at = NOW()
            WHERE payment_id = $1
            RETURNING id
            ",
        )
        .bind(payment_id)
        .bind(status.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(id.map(OrderId::new))
    }
}

/// Insert an order and its items inside a checkout transaction.
pub(crate) async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder,
) -> Result<OrderId, RepositoryError> {
    let id = sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO orders (user_id, shipping_address_id, delivery_address, customer_name,
                            customer_phone, customer_email, comment, total, payment_method)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        ",
    )
    .bind(order.user_id)
    .bind(order.shipping_address_id)
    .bind(&order.delivery_address)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(&order.customer_email)
    .bind(&order.comment)
    .bind(order.total.amount())
    .bind(order.payment_method.as_str())
    .fetch_one(&mut *conn)
    .await?;

    for item in &order.items {
        sqlx::query(
            r"
            INSERT INTO order_items (order_id, product_id, product_name, unit_price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.unit_price.amount())
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(OrderId::new(id))
}
