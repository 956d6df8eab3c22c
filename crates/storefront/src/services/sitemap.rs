//! `sitemap.xml` for search engines.

use super::xml::{XmlDoc, XmlError};
use crate::db::catalog::SlugStamp;
use crate::models::Category;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Render the sitemap: home page, category pages, product pages.
///
/// # Errors
///
/// Returns [`XmlError`] on write failure.
pub fn render_sitemap(
    base_url: &str,
    categories: &[Category],
    products: &[SlugStamp],
) -> Result<String, XmlError> {
    let mut doc = XmlDoc::new()?;
    doc.open("urlset", &[("xmlns", SITEMAP_NS)])?;

    url(&mut doc, &format!("{base_url}/"), None, "daily", "1.0")?;

    for category in categories {
        let loc = format!("{base_url}/catalog/{}", category.slug);
        let lastmod = category.updated_at.format("%Y-%m-%d").to_string();
        url(&mut doc, &loc, Some(&lastmod), "weekly", "0.8")?;
    }

    for product in products {
        let loc = format!("{base_url}/product/{}", product.slug);
        let lastmod = product.updated_at.format("%Y-%m-%d").to_string();
        url(&mut doc, &loc, Some(&lastmod), "weekly", "0.6")?;
    }

    doc.close("urlset")?;
    doc.finish()
}

fn url(
    doc: &mut XmlDoc,
    loc: &str,
    lastmod: Option<&str>,
    changefreq: &str,
    priority: &str,
) -> Result<(), XmlError> {
    doc.open("url", &[])?;
    doc.text("loc", &[], loc)?;
    if let Some(lastmod) = lastmod {
        doc.text("lastmod", &[], lastmod)?;
    }
    doc.text("changefreq", &[], changefreq)?;
    doc.text("priority", &[], priority)?;
    doc.close("url")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use vitrina_core::CategoryId;

    use super::*;

    #[test]
    fn test_lists_home_categories_and_products() {
        let stamp = Utc.with_ymd_and_hms(2026, 3, 8, 10, 0, 0).unwrap();
        let categories = [Category {
            id: CategoryId::new(1),
            slug: "green-tea".to_owned(),
            name: "Зелёный чай".to_owned(),
            parent_id: None,
            position: 0,
            created_at: stamp,
            updated_at: stamp,
        }];
        let products = [SlugStamp {
            slug: "sencha".to_owned(),
            updated_at: stamp,
        }];

        let xml = render_sitemap("https://shop.test", &categories, &products).unwrap();

        assert!(xml.contains(&format!("<urlset xmlns=\"{SITEMAP_NS}\">")));
        assert!(xml.contains("<loc>https://shop.test/</loc>"));
        assert!(xml.contains("<loc>https://shop.test/catalog/green-tea</loc>"));
        assert!(xml.contains("<loc>https://shop.test/product/sencha</loc>"));
        assert!(xml.contains("<lastmod>2026-03-08</lastmod>"));
        assert_eq!(xml.matches("<url>").count(), 3);
    }
}
