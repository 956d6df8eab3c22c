//! Products and categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrina_core::{CategoryId, Money, ProductId};

use super::{nullable, require, require_if_present, validate_slug};

/// A catalog category. Categories form a shallow tree through `parent_id`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product as stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub price: Money,
    pub sale_price: Option<Money>,
    pub stock: i32,
    pub is_published: bool,
    /// Public URL paths, first one is the main image.
    pub images: Vec<String>,
    pub vendor: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// What the customer pays: the sale price when one is set.
    #[must_use]
    pub fn current_price(&self) -> Money {
        self.sale_price.unwrap_or(self.price)
    }

    /// The crossed-out price, present only while on sale.
    #[must_use]
    pub fn old_price(&self) -> Option<Money> {
        self.sale_price.map(|_| self.price)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Body of `POST /api/admin/products`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProduct {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub price: Money,
    #[serde(default)]
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub vendor: Option<String>,
}

impl NewProduct {
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_slug(&self.slug)?;
        require("name", &self.name)?;
        if self.stock < 0 {
            return Err("stock cannot be negative".to_owned());
        }
        Ok(())
    }
}

/// Body of `PATCH /api/admin/products/{id}`.
///
/// Omitted fields are unchanged; `null` clears the nullable ones
/// (`categoryId`, `salePrice`, `vendor`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductPatch {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<CategoryId>>,
    pub price: Option<Money>,
    #[serde(default, deserialize_with = "nullable")]
    pub sale_price: Option<Option<Money>>,
    pub stock: Option<i32>,
    pub is_published: Option<bool>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub vendor: Option<Option<String>>,
}

impl ProductPatch {
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        require_if_present("name", self.name.as_deref())?;
        if self.stock.is_some_and(|stock| stock < 0) {
            return Err("stock cannot be negative".to_owned());
        }
        Ok(())
    }
}

/// Body of `POST /api/admin/categories`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCategory {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub position: i32,
}

impl NewCategory {
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_slug(&self.slug)?;
        require("name", &self.name)
    }
}

/// Body of `PATCH /api/admin/categories/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryPatch {
    pub slug: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub parent_id: Option<Option<CategoryId>>,
    pub position: Option<i32>,
}

impl CategoryPatch {
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self, id: CategoryId) -> Result<(), String> {
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        if self.parent_id == Some(Some(id)) {
            return Err("a category cannot be its own parent".to_owned());
        }
        require_if_present("name", self.name.as_deref())
    }
}
