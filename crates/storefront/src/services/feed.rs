//! Yandex YML catalog feed.
//!
//! Offers are written as product rows stream in from the database, so the
//! catalog is never materialized as a `Vec`. Prices follow the YML sale
//! convention: `price` is what the customer pays and `oldprice` appears only
//! while a sale price is set.

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use thiserror::Error;

use vitrina_core::Money;

use super::xml::{XmlDoc, XmlError};
use crate::db::RepositoryError;
use crate::models::{Category, Product};

/// Errors that can occur while generating a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Reading products or categories failed.
    #[error("feed database error: {0}")]
    Database(#[from] RepositoryError),

    /// Writing the document failed.
    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Shop block of the feed.
#[derive(Debug, Clone)]
pub struct ShopInfo<'a> {
    pub name: &'a str,
    pub company: &'a str,
    /// Public base URL without trailing slash.
    pub base_url: &'a str,
}

impl ShopInfo<'_> {
    /// Absolute URL for a site path; absolute URLs pass through.
    fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

/// Render the YML document.
///
/// `products` is consumed lazily; the first row error aborts the render.
///
/// # Errors
///
/// Returns [`FeedError::Database`] if a row fails to load, or
/// [`FeedError::Xml`] on a write failure.
pub async fn render_feed<S>(
    shop: &ShopInfo<'_>,
    categories: &[Category],
    products: S,
    generated_at: DateTime<Utc>,
) -> Result<String, FeedError>
where
    S: Stream<Item = Result<Product, RepositoryError>>,
{
    let mut doc = XmlDoc::new()?;
    let date = generated_at.format("%Y-%m-%dT%H:%M:%S+00:00").to_string();

    doc.open("yml_catalog", &[("date", &date)])?;
    doc.open("shop", &[])?;
    doc.text("name", &[], shop.name)?;
    doc.text("company", &[], shop.company)?;
    doc.text("url", &[], shop.base_url)?;

    doc.open("currencies", &[])?;
    doc.empty("currency", &[("id", Money::CURRENCY), ("rate", "1")])?;
    doc.close("currencies")?;

    doc.open("categories", &[])?;
    for category in categories {
        let id = category.id.to_string();
        let parent = category.parent_id.map(|p| p.to_string());
        let mut attributes = vec![("id", id.as_str())];
        if let Some(parent) = parent.as_deref() {
            attributes.push(("parentId", parent));
        }
        doc.text("category", &attributes, &category.name)?;
    }
    doc.close("categories")?;

    doc.open("offers", &[])?;
    let mut products = std::pin::pin!(products);
    let mut count = 0_usize;
    while let Some(product) = products.next().await {
        write_offer(&mut doc, shop, &product?)?;
        count += 1;
    }
    doc.close("offers")?;

    doc.close("shop")?;
    doc.close("yml_catalog")?;

    tracing::debug!(offers = count, "Rendered YML feed");

    Ok(doc.finish()?)
}

fn write_offer(doc: &mut XmlDoc, shop: &ShopInfo<'_>, product: &Product) -> Result<(), XmlError> {
    let id = product.id.to_string();
    let available = if product.in_stock() { "true" } else { "false" };

    doc.open("offer", &[("id", &id), ("available", available)])?;
    doc.text("name", &[], &product.name)?;
    doc.text("url", &[], &shop.absolute(&format!("/product/{}", product.slug)))?;
    doc.text("price", &[], &product.current_price().to_fixed())?;
    if let Some(old_price) = product.old_price() {
        doc.text("oldprice", &[], &old_price.to_fixed())?;
    }
    doc.text("currencyId", &[], Money::CURRENCY)?;
    if let Some(category_id) = product.category_id {
        doc.text("categoryId", &[], &category_id.to_string())?;
    }
    for image in &product.images {
        doc.text("picture", &[], &shop.absolute(image))?;
    }
    if let Some(vendor) = product.vendor.as_deref() {
        doc.text("vendor", &[], vendor)?;
    }
    if !product.description.trim().is_empty() {
        doc.text("description", &[], &product.description)?;
    }
    doc.close("offer")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use futures::stream;

    use vitrina_core::{CategoryId, ProductId};

    use super::*;

    const SHOP: ShopInfo<'static> = ShopInfo {
        name: "Чайная лавка",
        company: "ООО \"Чай & Ко\"",
        base_url: "https://shop.test",
    };

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn product(id: i32, name: &str, price: u32, sale: Option<u32>) -> Product {
        Product {
            id: ProductId::new(id),
            slug: format!("product-{id}"),
            name: name.to_owned(),
            description: String::new(),
            category_id: Some(CategoryId::new(1)),
            price: Money::rubles(price),
            sale_price: sale.map(Money::rubles),
            stock: 3,
            is_published: true,
            images: vec![format!("/uploads/{id}.jpg")],
            vendor: None,
            created_at: at(),
            updated_at: at(),
        }
    }

    fn category() -> Category {
        Category {
            id: CategoryId::new(1),
            slug: "tea".to_owned(),
            name: "Чай".to_owned(),
            parent_id: None,
            position: 0,
            created_at: at(),
            updated_at: at(),
        }
    }

    async fn render(products: Vec<Product>) -> String {
        render_feed(
            &SHOP,
            &[category()],
            stream::iter(products.into_iter().map(Ok)),
            at(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_escapes_reserved_characters() {
        let xml = render(vec![product(1, "Tom & Jerry's <\"Best\">", 100, None)]).await;
        assert!(xml.contains("<name>Tom &amp; Jerry&apos;s &lt;&quot;Best&quot;&gt;</name>"));
        assert!(xml.contains("<company>ООО &quot;Чай &amp; Ко&quot;</company>"));
        assert!(!xml.contains("Tom & Jerry"));
    }

    #[tokio::test]
    async fn test_oldprice_only_with_sale_price() {
        let xml = render(vec![product(1, "Sale", 1000, Some(800))]).await;
        assert!(xml.contains("<price>800.00</price>"));
        assert!(xml.contains("<oldprice>1000.00</oldprice>"));

        let xml = render(vec![product(2, "Regular", 1000, None)]).await;
        assert!(xml.contains("<price>1000.00</price>"));
        assert!(!xml.contains("oldprice"));
    }

    #[tokio::test]
    async fn test_document_structure() {
        let xml = render(vec![product(7, "Пуэр", 450, None)]).await;
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<yml_catalog date=\"2026-10-19T12:00:00+00:00\">"));
        assert!(xml.contains("<currency id=\"RUB\" rate=\"1\"/>"));
        assert!(xml.contains("<category id=\"1\">Чай</category>"));
        assert!(xml.contains("<offer id=\"7\" available=\"true\">"));
        assert!(xml.contains("<url>https://shop.test/product/product-7</url>"));
        assert!(xml.contains("<picture>https://shop.test/uploads/7.jpg</picture>"));
        assert!(xml.contains("<categoryId>1</categoryId>"));
    }

    #[tokio::test]
    async fn test_empty_catalog_still_valid() {
        let xml = render(Vec::new()).await;
        assert!(xml.contains("<offers>"));
        assert!(xml.trim_end().ends_with("</yml_catalog>"));
    }

    #[tokio::test]
    async fn test_row_error_aborts_render() {
        let rows = stream::iter(vec![
            Ok(product(1, "Ok", 10, None)),
            Err(RepositoryError::DataCorruption("bad price".to_owned())),
        ]);
        let result = render_feed(&SHOP, &[], rows, at()).await;
        assert!(matches!(result, Err(FeedError::Database(_))));
    }
}
