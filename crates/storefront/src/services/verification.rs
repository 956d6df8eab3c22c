//! Login code generation and delivery.
//!
//! Delivery is best-effort. When the channel is not configured, or the
//! provider fails, the code is written to the log at `warn` level and the
//! request still succeeds, so development setups work without providers.

use rand::Rng;

use super::email::EmailService;
use super::sms::SmsClient;
use crate::db::Contact;

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Sends login codes over whichever channel the contact calls for.
#[derive(Clone, Default)]
pub struct CodeSender {
    sms: Option<SmsClient>,
    email: Option<EmailService>,
}

/// How a code reached (or failed to reach) the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Logged,
}

impl CodeSender {
    #[must_use]
    pub const fn new(sms: Option<SmsClient>, email: Option<EmailService>) -> Self {
        Self { sms, email }
    }

    /// Deliver `code` to `contact`.
    pub async fn send(&self, contact: &Contact, code: &str) -> Delivery {
        let result = match (contact, &self.sms, &self.email) {
            (Contact::Phone(phone), Some(sms), _) => sms
                .send(phone, &format!("Код для входа: {code}"))
                .await
                .map_err(|e| e.to_string()),
            (Contact::Email(email), _, Some(mailer)) => mailer
                .send_login_code(email.as_str(), code)
                .await
                .map_err(|e| e.to_string()),
            _ => Err("channel not configured".to_owned()),
        };

        match result {
            Ok(()) => Delivery::Sent,
            Err(reason) => {
                tracing::warn!(
                    channel = contact.channel(),
                    to = %contact.masked(),
                    code = %code,
                    reason = %reason,
                    "Login code not delivered, logging instead"
                );
                Delivery::Logged
            }
        }
    }
}
