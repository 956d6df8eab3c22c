//! Product and category repositories.

use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use vitrina_core::{CategoryId, ProductId};

use super::{RepositoryError, money_column};
use crate::models::{Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch};

/// Default page size for product listings.
pub const DEFAULT_PER_PAGE: u32 = 24;
/// Largest page size a client may ask for.
pub const MAX_PER_PAGE: u32 = 100;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    slug: String,
    name: String,
    description: String,
    category_id: Option<i32>,
    price: Decimal,
    sale_price: Option<Decimal>,
    stock: i32,
    is_published: bool,
    images: Vec<String>,
    vendor: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            slug: row.slug,
            name: row.name,
            description: row.description,
            category_id: row.category_id.map(CategoryId::new),
            price: money_column(row.price)?,
            sale_price: row.sale_price.map(money_column).transpose()?,
            stock: row.stock,
            is_published: row.is_published,
            images: row.images,
            vendor: row.vendor,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    slug: String,
    name: String,
    parent_id: Option<i32>,
    position: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            slug: row.slug,
            name: row.name,
            parent_id: row.parent_id.map(CategoryId::new),
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Public product listing filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Category slug.
    pub category: Option<String>,
    /// Case-insensitive substring of name or description.
    pub query: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductFilter {
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.page
            .unwrap_or(1)
            .max(1)
            .saturating_sub(1)
            .saturating_mul(self.limit())
    }

    fn pattern(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)))
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A product URL entry for the sitemap.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SlugStamp {
    pub slug: String,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product repository
// =============================================================================

/// Repository for products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of published products plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_published(
        &self,
        filter: &ProductFilter,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let pattern = filter.pattern();

        let total = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.is_published
              AND ($1::text IS NULL OR c.slug = $1)
              AND ($2::text IS NULL OR p.name ILIKE $2 OR p.description ILIKE $2)
            ",
        )
        .bind(&filter.category)
        .bind(&pattern)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT p.id, p.slug, p.name, p.description, p.category_id, p.price,
                   p.sale_price, p.stock, p.is_published, p.images, p.vendor,
                   p.created_at, p.updated_at
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.is_published
              AND ($1::text IS NULL OR c.slug = $1)
              AND ($2::text IS NULL OR p.name ILIKE $2 OR p.description ILIKE $2)
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(&filter.category)
        .bind(&pattern)
        .bind(i64::from(filter.limit()))
        .bind(i64::from(filter.offset()))
        .fetch_all(self.pool)
        .await?;

        let products = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((products, total))
    }

    /// A published product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no such published
    /// product.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, slug, name, description, category_id, price, sale_price, stock,
                   is_published, images, vendor, created_at, updated_at
            FROM products
            WHERE slug = $1 AND is_published
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    /// Any product by ID, published or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, slug, name, description, category_id, price, sale_price, stock,
                   is_published, images, vendor, created_at, updated_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    /// Every product for the admin list, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, slug, name, description, category_id, price, sale_price, stock,
                   is_published, images, vendor, created_at, updated_at
            FROM products
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Published products as a row stream, for the YML feed.
    ///
    /// Rows are decoded as they arrive; the full catalog is never held in
    /// memory. Calling this again starts a new query.
    #[must_use]
    pub fn stream_published(&self) -> BoxStream<'a, Result<Product, RepositoryError>> {
        sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, slug, name, description, category_id, price, sale_price, stock,
                   is_published, images, vendor, created_at, updated_at
            FROM products
            WHERE is_published
            ORDER BY id
            ",
        )
        .fetch(self.pool)
        .map(|row| row.map_err(RepositoryError::from).and_then(TryInto::try_into))
        .boxed()
    }

    /// Slugs and modification times of published products, for the
    /// sitemap.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn published_slugs(&self) -> Result<Vec<SlugStamp>, RepositoryError> {
        Ok(sqlx::query_as::<_, SlugStamp>(
            "SELECT slug, updated_at FROM products WHERE is_published ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the
    /// category does not exist.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (slug, name, description, category_id, price, sale_price,
                                  stock, is_published, images, vendor)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, slug, name, description, category_id, price, sale_price, stock,
                      is_published, images, vendor, created_at, updated_at
            ",
        )
        .bind(&product.slug)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.category_id)
        .bind(product.price.amount())
        .bind(product.sale_price.map(|m| m.amount()))
        .bind(product.stock)
        .bind(product.is_published)
        .bind(&product.images)
        .bind(&product.vendor)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "product"))?
        .try_into()
    }

    /// Apply an admin patch.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE products SET
                slug         = COALESCE($2, slug),
                name         = COALESCE($3, name),
                description  = COALESCE($4, description),
                category_id  = CASE WHEN $5 THEN $6 ELSE category_id END,
                price        = COALESCE($7, price),
                sale_price   = CASE WHEN $8 THEN $9 ELSE sale_price END,
                stock        = COALESCE($10, stock),
                is_published = COALESCE($11, is_published),
                images       = COALESCE($12, images),
                vendor       = CASE WHEN $13 THEN $14 ELSE vendor END,
                updated_at   = NOW()
            WHERE id = $1
            RETURNING id, slug, name, description, category_id, price, sale_price, stock,
                      is_published, images, vendor, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&patch.slug)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.category_id.is_some())
        .bind(patch.category_id.flatten())
        .bind(patch.price.map(|m| m.amount()))
        .bind(patch.sale_price.is_some())
        .bind(patch.sale_price.flatten().map(|m| m.amount()))
        .bind(patch.stock)
        .bind(patch.is_published)
        .bind(&patch.images)
        .bind(patch.vendor.is_some())
        .bind(patch.vendor.clone().flatten())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "product"))?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    /// Delete a product. Cart and wishlist rows go with it; order items keep
    /// their name and price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

/// Lock the given products for a checkout transaction.
///
/// Rows are locked in ID order so concurrent checkouts over overlapping
/// carts cannot deadlock.
pub(crate) async fn lock_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        r"
        SELECT id, slug, name, description, category_id, price, sale_price, stock,
               is_published, images, vendor, created_at, updated_at
        FROM products
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

/// Take `quantity` units of stock. Caller has already checked availability
/// under the row lock.
pub(crate) async fn take_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Category repository
// =============================================================================

/// Repository for categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories by position, then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, slug, name, parent_id, position, created_at, updated_at
            FROM categories
            ORDER BY position, name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the parent
    /// does not exist.
    pub async fn create(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO categories (slug, name, parent_id, position)
            VALUES ($1, $2, $3, $4)
            RETURNING id, slug, name, parent_id, position, created_at, updated_at
            ",
        )
        .bind(&category.slug)
        .bind(&category.name)
        .bind(category.parent_id)
        .bind(category.position)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "category"))?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            UPDATE categories SET
                slug       = COALESCE($2, slug),
                name       = COALESCE($3, name),
                parent_id  = CASE WHEN $4 THEN $5 ELSE parent_id END,
                position   = COALESCE($6, position),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, slug, name, parent_id, position, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&patch.slug)
        .bind(&patch.name)
        .bind(patch.parent_id.is_some())
        .bind(patch.parent_id.flatten())
        .bind(patch.position)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "category"))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a category. Its products and subcategories are detached, not
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let filter = ProductFilter {
            page: Some(3),
            per_page: Some(500),
            ..ProductFilter::default()
        };
        assert_eq!(filter.limit(), MAX_PER_PAGE);
        assert_eq!(filter.offset(), 200);

        let first = ProductFilter {
            page: Some(0),
            per_page: Some(0),
            ..ProductFilter::default()
        };
        assert_eq!(first.limit(), 1);
        assert_eq!(first.offset(), 0);

        assert_eq!(ProductFilter::default().limit(), DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let filter = ProductFilter {
            query: Some(" 100%_чай ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.pattern().as_deref(), Some("%100\\%\\_чай%"));

        let blank = ProductFilter {
            query: Some("   ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(blank.pattern(), None);
    }
}
