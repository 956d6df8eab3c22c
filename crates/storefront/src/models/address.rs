//! Shipping address types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrina_core::{AddressId, UserId};

use super::{require, require_if_present};

/// A saved shipping address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub recipient_name: String,
    pub phone: String,
    pub country: String,
    pub region: Option<String>,
    pub city: String,
    pub street: String,
    pub house: String,
    pub apartment: Option<String>,
    pub postal_code: Option<String>,
    pub comment: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// One-line postal form used for order snapshots and admin lists.
    ///
    /// `"123456, Россия, Московская обл., Москва, ул. Ленина, д. 1, кв. 5"`
    #[must_use]
    pub fn one_line(&self) -> String {
        AddressFields::from(self).one_line()
    }
}

fn default_country() -> String {
    "Россия".to_owned()
}

/// Body of an address create request, also used for inline checkout
/// addresses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddressFields {
    pub recipient_name: String,
    pub phone: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub region: Option<String>,
    pub city: String,
    pub street: String,
    pub house: String,
    #[serde(default)]
    pub apartment: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressFields {
    /// Presence check on required fields. Values are otherwise stored as
    /// given.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first blank required field.
    pub fn validate(&self) -> Result<(), String> {
        require("recipientName", &self.recipient_name)?;
        require("phone", &self.phone)?;
        require("city", &self.city)?;
        require("street", &self.street)?;
        require("house", &self.house)
    }

    #[must_use]
    pub fn one_line(&self) -> String {
        let apartment = self.apartment.as_deref().map(|a| format!("кв. {a}"));
        let house = format!("д. {}", self.house);
        [
            self.postal_code.as_deref(),
            Some(self.country.as_str()),
            self.region.as_deref(),
            Some(self.city.as_str()),
            Some(self.street.as_str()),
            Some(house.as_str()),
            apartment.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl From<&Address> for AddressFields {
    fn from(address: &Address) -> Self {
        Self {
            recipient_name: address.recipient_name.clone(),
            phone: address.phone.clone(),
            country: address.country.clone(),
            region: address.region.clone(),
            city: address.city.clone(),
            street: address.street.clone(),
            house: address.house.clone(),
            apartment: address.apartment.clone(),
            postal_code: address.postal_code.clone(),
            comment: address.comment.clone(),
            is_default: address.is_default,
        }
    }
}

/// Body of an address update request.
///
/// Omitted fields are left unchanged. For the optional columns an empty
/// string clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddressPatch {
    pub recipient_name: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub apartment: Option<String>,
    pub postal_code: Option<String>,
    pub comment: Option<String>,
    pub is_default: Option<bool>,
}

impl AddressPatch {
    /// # Errors
    ///
    /// Returns a message naming the first required field set to blank.
    pub fn validate(&self) -> Result<(), String> {
        require_if_present("recipientName", self.recipient_name.as_deref())?;
        require_if_present("phone", self.phone.as_deref())?;
        require_if_present("country", self.country.as_deref())?;
        require_if_present("city", self.city.as_deref())?;
        require_if_present("street", self.street.as_deref())?;
        require_if_present("house", self.house.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields() -> AddressFields {
        serde_json::from_value(serde_json::json!({
            "recipientName": "Иван Петров",
            "phone": "+79161234567",
            "city": "Москва",
            "street": "ул. Ленина",
            "house": "1",
            "apartment": "5",
            "postalCode": "123456"
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_for_omitted_fields() {
        let f = fields();
        assert_eq!(f.country, "Россия");
        assert!(!f.is_default);
        assert!(f.region.is_none());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = serde_json::from_value::<AddressFields>(serde_json::json!({
            "recipientName": "a", "phone": "b", "city": "c", "street": "d",
            "house": "e", "userId": 42
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_requires_fields() {
        let mut f = fields();
        assert!(f.validate().is_ok());
        f.street = "  ".to_owned();
        assert_eq!(f.validate().unwrap_err(), "street is required");
    }

    #[test]
    fn test_patch_cannot_blank_required_field() {
        let patch = AddressPatch {
            city: Some(String::new()),
            ..AddressPatch::default()
        };
        assert!(patch.validate().is_err());
        assert!(AddressPatch::default().validate().is_ok());
    }

    #[test]
    fn test_one_line() {
        assert_eq!(
            fields().one_line(),
            "123456, Россия, Москва, ул. Ленина, д. 1, кв. 5"
        );
    }
}
