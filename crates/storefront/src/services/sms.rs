//! SMS delivery through the sms.ru HTTP API.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use vitrina_core::Phone;

use crate::config::SmsConfig;

const API_URL: &str = "https://sms.ru/sms/send";

/// Errors that can occur when sending an SMS.
#[derive(Debug, Error)]
pub enum SmsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway refused the message.
    #[error("gateway rejected message: {status_code} {text}")]
    Rejected { status_code: i64, text: String },
}

/// sms.ru reply with `json=1`.
#[derive(Debug, Deserialize)]
struct SendResponse {
    status: String,
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    status_text: Option<String>,
    #[serde(default)]
    sms: std::collections::HashMap<String, SmsResult>,
}

#[derive(Debug, Deserialize)]
struct SmsResult {
    status: String,
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    status_text: Option<String>,
}

impl SendResponse {
    fn into_result(self) -> Result<(), SmsError> {
        if self.status != "OK" {
            return Err(SmsError::Rejected {
                status_code: self.status_code,
                text: self.status_text.unwrap_or_default(),
            });
        }
        if let Some(failed) = self.sms.into_values().find(|sms| sms.status != "OK") {
            return Err(SmsError::Rejected {
                status_code: failed.status_code,
                text: failed.status_text.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// sms.ru client.
#[derive(Clone)]
pub struct SmsClient {
    client: reqwest::Client,
    api_id: SecretString,
    sender: Option<String>,
}

impl SmsClient {
    /// Create a new SMS client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &SmsConfig) -> Result<Self, SmsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_id: config.api_id.clone(),
            sender: config.sender.clone(),
        })
    }

    /// Send `message` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`SmsError`] if the request fails or the gateway refuses it.
    pub async fn send(&self, to: &Phone, message: &str) -> Result<(), SmsError> {
        let mut query = vec![
            ("api_id", self.api_id.expose_secret()),
            ("to", to.digits()),
            ("msg", message),
            ("json", "1"),
        ];
        if let Some(sender) = self.sender.as_deref() {
            query.push(("from", sender));
        }

        let response: SendResponse = self
            .client
            .get(API_URL)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_result()?;
        tracing::info!(to = %to.masked(), "SMS sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SendResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_accepts_ok_reply() {
        let reply = parse(
            r#"{"status":"OK","status_code":100,"sms":{"79161234567":{"status":"OK","status_code":100,"sms_id":"000-1"}},"balance":10.5}"#,
        );
        assert!(reply.into_result().is_ok());
    }

    #[test]
    fn test_reports_per_number_failure() {
        let reply = parse(
            r#"{"status":"OK","status_code":100,"sms":{"79161234567":{"status":"ERROR","status_code":207,"status_text":"Нельзя отправлять на этот номер"}}}"#,
        );
        let err = reply.into_result().unwrap_err();
        assert!(matches!(err, SmsError::Rejected { status_code: 207, .. }));
    }

    #[test]
    fn test_reports_request_failure() {
        let reply = parse(r#"{"status":"ERROR","status_code":200,"status_text":"Неправильный api_id"}"#);
        assert!(reply.into_result().is_err());
    }
}
