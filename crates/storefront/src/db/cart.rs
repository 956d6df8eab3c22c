//! Cart and wishlist repositories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use vitrina_core::{ProductId, UserId};

use super::{RepositoryError, money_column};
use crate::models::cart::MAX_LINE_QUANTITY;
use crate::models::{Cart, CartLine, WishlistEntry};

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: i32,
    slug: String,
    name: String,
    image: Option<String>,
    price: Decimal,
    sale_price: Option<Decimal>,
    quantity: i32,
    stock: i32,
    is_published: bool,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let unit_price = money_column(row.sale_price.unwrap_or(row.price))?;
        let line_total = unit_price
            .times(row.quantity.unsigned_abs())
            .map_err(|e| RepositoryError::DataCorruption(format!("cart line total: {e}")))?;

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            slug: row.slug,
            name: row.name,
            image: row.image,
            unit_price,
            quantity: row.quantity,
            line_total,
            available: row.is_published && row.stock >= row.quantity,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WishlistRow {
    product_id: i32,
    slug: String,
    name: String,
    image: Option<String>,
    price: Decimal,
    sale_price: Option<Decimal>,
    added_at: DateTime<Utc>,
}

impl TryFrom<WishlistRow> for WishlistEntry {
    type Error = RepositoryError;

    fn try_from(row: WishlistRow) -> Result<Self, Self::Error> {
        let price = money_column(row.price)?;
        let sale = row.sale_price.map(money_column).transpose()?;

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            slug: row.slug,
            name: row.name,
            image: row.image,
            price: sale.unwrap_or(price),
            old_price: sale.map(|_| price),
            added_at: row.added_at,
        })
    }
}

/// Repository for a user's cart.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart with current prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT p.id AS product_id, p.slug, p.name, p.images[1] AS image,
                   p.price, p.sale_price, ci.quantity, p.stock, p.is_published
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Cart::from_lines(lines)
            .map_err(|e| RepositoryError::DataCorruption(format!("cart total: {e}")))
    }

    /// Add `quantity` of a published product, summing with any existing
    /// line and capping at the per-line maximum.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not published.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            SELECT $1, p.id, LEAST($3, $4)
            FROM products p
            WHERE p.id = $2 AND p.is_published
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $4),
                updated_at = NOW()
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(MAX_LINE_QUANTITY)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE cart_items SET quantity = $3, updated_at = NOW()
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        clear_cart(&mut conn, user_id).await
    }
}

/// `(product, quantity)` pairs in the user's cart, for checkout.
pub(crate) async fn cart_quantities(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<(ProductId, i32)>, RepositoryError> {
    let rows = sqlx::query_as::<_, (i32, i32)>(
        "SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY product_id",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, quantity)| (ProductId::new(id), quantity))
        .collect())
}

pub(crate) async fn clear_cart(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Repository for a user's wishlist.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r"
            SELECT p.id AS product_id, p.slug, p.name, p.images[1] AS image,
                   p.price, p.sale_price, w.created_at AS added_at
            FROM wishlist_items w
            JOIN products p ON p.id = w.product_id
            WHERE w.user_id = $1 AND p.is_published
            ORDER BY w.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Add a published product. Adding twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not published.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let published = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM products WHERE id = $1 AND is_published)",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        if !published {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO wishlist_items (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the
    /// wishlist.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
