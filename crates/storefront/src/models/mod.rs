//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the row types the
//! repositories decode. Request bodies that carry them are allow-listed
//! structs so a client can never write a column it was not meant to.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod pixel;
pub mod session;
pub mod settings;
pub mod user;

pub use address::{Address, AddressFields, AddressPatch};
pub use cart::{Cart, CartLine, WishlistEntry};
pub use catalog::{Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderSummary};
pub use pixel::{NewTrackingPixel, PixelPlacement, PixelProvider, TrackingPixel, TrackingPixelPatch};
pub use session::CurrentUser;
pub use settings::SettingKey;
pub use user::User;

/// Error naming `field` when `value` is blank.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}

/// A patch may omit a required field but may not blank it.
pub(crate) fn require_if_present(field: &'static str, value: Option<&str>) -> Result<(), String> {
    value.map_or(Ok(()), |v| require(field, v))
}

/// Lowercase ASCII letters, digits and single hyphens, as used in URLs.
pub(crate) fn validate_slug(slug: &str) -> Result<(), String> {
    let well_formed = !slug.is_empty()
        && slug.len() <= 120
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if well_formed {
        Ok(())
    } else {
        Err(format!("invalid slug: {slug:?}"))
    }
}

/// Distinguishes an omitted patch field (`None`) from an explicit `null`
/// (`Some(None)`). Use with `#[serde(default, deserialize_with = "nullable")]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    <Option<T> as serde::Deserialize>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("chai-pu-er-2019").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Chai").is_err());
        assert!(validate_slug("-chai").is_err());
        assert!(validate_slug("chai--pu").is_err());
        assert!(validate_slug("чай").is_err());
    }
}
