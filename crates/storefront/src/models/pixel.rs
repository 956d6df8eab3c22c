//! Analytics tracking pixels configured by admins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitrina_core::{TrackingPixelId, UnknownVariant};

use super::{nullable, require, require_if_present};

/// Analytics provider of a tracking pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelProvider {
    YandexMetrika,
    Vk,
    GoogleAnalytics,
    Meta,
    /// Raw snippet supplied by the admin.
    Custom,
}

impl PixelProvider {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::YandexMetrika => "yandex_metrika",
            Self::Vk => "vk",
            Self::GoogleAnalytics => "google_analytics",
            Self::Meta => "meta",
            Self::Custom => "custom",
        }
    }
}

impl std::str::FromStr for PixelProvider {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yandex_metrika" => Ok(Self::YandexMetrika),
            "vk" => Ok(Self::Vk),
            "google_analytics" => Ok(Self::GoogleAnalytics),
            "meta" => Ok(Self::Meta),
            "custom" => Ok(Self::Custom),
            _ => Err(UnknownVariant {
                kind: "pixel provider",
                value: s.to_owned(),
            }),
        }
    }
}

/// Where in the page the pixel is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelPlacement {
    #[default]
    Head,
    Body,
}

impl PixelPlacement {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Body => "body",
        }
    }
}

impl std::str::FromStr for PixelPlacement {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(Self::Head),
            "body" => Ok(Self::Body),
            _ => Err(UnknownVariant {
                kind: "pixel placement",
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPixel {
    pub id: TrackingPixelId,
    pub provider: PixelProvider,
    pub counter_id: String,
    pub snippet: Option<String>,
    pub placement: PixelPlacement,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTrackingPixel {
    pub provider: PixelProvider,
    pub counter_id: String,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub placement: PixelPlacement,
    #[serde(default = "enabled")]
    pub is_enabled: bool,
}

const fn enabled() -> bool {
    true
}

impl NewTrackingPixel {
    /// # Errors
    ///
    /// Returns a message when the counter is blank or a custom pixel has no
    /// snippet.
    pub fn validate(&self) -> Result<(), String> {
        require("counterId", &self.counter_id)?;
        if self.provider == PixelProvider::Custom
            && self.snippet.as_deref().is_none_or(|s| s.trim().is_empty())
        {
            return Err("custom pixels need a snippet".to_owned());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrackingPixelPatch {
    pub provider: Option<PixelProvider>,
    pub counter_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub snippet: Option<Option<String>>,
    pub placement: Option<PixelPlacement>,
    pub is_enabled: Option<bool>,
}

impl TrackingPixelPatch {
    /// # Errors
    ///
    /// Returns a message when the counter is set to blank.
    pub fn validate(&self) -> Result<(), String> {
        require_if_present("counterId", self.counter_id.as_deref())
    }
}
