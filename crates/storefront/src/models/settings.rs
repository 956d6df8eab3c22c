//! Allow-listed shop settings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keys an admin may set. Anything else is rejected before it reaches the
/// database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    ShopName,
    ShopPhone,
    ShopEmail,
    DeliveryInfo,
    /// Order total (rubles) from which delivery is free.
    FreeDeliveryThreshold,
}

impl SettingKey {
    pub const ALL: [Self; 5] = [
        Self::ShopName,
        Self::ShopPhone,
        Self::ShopEmail,
        Self::DeliveryInfo,
        Self::FreeDeliveryThreshold,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ShopName => "shop_name",
            Self::ShopPhone => "shop_phone",
            Self::ShopEmail => "shop_email",
            Self::DeliveryInfo => "delivery_info",
            Self::FreeDeliveryThreshold => "free_delivery_threshold",
        }
    }

    /// Check that `value` has the JSON shape this key stores.
    ///
    /// # Errors
    ///
    /// Returns a message describing the expected shape.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let ok = match self {
            Self::FreeDeliveryThreshold => {
                value.is_null() || value.as_f64().is_some_and(|n| n >= 0.0)
            }
            _ => value.is_string(),
        };
        if ok {
            Ok(())
        } else if *self == Self::FreeDeliveryThreshold {
            Err(format!("{} must be a non-negative number or null", self.as_str()))
        } else {
            Err(format!("{} must be a string", self.as_str()))
        }
    }
}

impl std::str::FromStr for SettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown setting: {s}"))
    }
}
