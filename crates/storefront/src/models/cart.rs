//! Cart and wishlist views.

use chrono::{DateTime, Utc};
use serde::Serialize;

use vitrina_core::{Money, MoneyError, ProductId};

/// Largest quantity of one product in a cart or order line.
pub const MAX_LINE_QUANTITY: i32 = 99;

/// One cart line joined with the current product data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: Money,
    pub quantity: i32,
    pub line_total: Money,
    /// False when the product was unpublished or sold out after being added.
    pub available: bool,
}

/// The user's cart with totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartLine>,
    pub item_count: i32,
    pub total: Money,
}

impl Cart {
    /// Sum lines into a cart. Unavailable lines are listed but not counted.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the total does not fit.
    pub fn from_lines(items: Vec<CartLine>) -> Result<Self, MoneyError> {
        let mut total = Money::ZERO;
        let mut item_count = 0;
        for line in items.iter().filter(|line| line.available) {
            total = total.plus(line.line_total)?;
            item_count += line.quantity;
        }
        Ok(Self {
            items,
            item_count,
            total,
        })
    }
}

/// A wishlist entry with enough product data to render a card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub image: Option<String>,
    pub price: Money,
    pub old_price: Option<Money>,
    pub added_at: DateTime<Utc>,
}
