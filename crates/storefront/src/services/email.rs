//! Email service for sending login codes.
//!
//! Uses SMTP via lettre for delivery.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    shop_name: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be set up.
    pub fn new(config: &EmailConfig, shop_name: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            shop_name: shop_name.to_owned(),
        })
    }

    /// Send a login code.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent.
    pub async fn send_login_code(&self, to: &str, code: &str) -> Result<(), EmailError> {
        let (text, html) = login_code_bodies(&self.shop_name, code);
        let subject = format!("Код для входа: {code}");
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Plain-text and HTML bodies of the login code email. The code is digits
/// only; the shop name is escaped for HTML.
fn login_code_bodies(shop_name: &str, code: &str) -> (String, String) {
    let text = format!(
        "Ваш код для входа в {shop_name}: {code}\n\n\
         Код действует 10 минут. Если вы не запрашивали код, просто проигнорируйте это письмо.\n"
    );
    let shop = quick_xml::escape::escape(shop_name);
    let html = format!(
        "<!doctype html><html><body>\
         <p>Ваш код для входа в {shop}:</p>\
         <p style=\"font-size:28px;font-weight:bold;letter-spacing:4px\">{code}</p>\
         <p>Код действует 10 минут. Если вы не запрашивали код, просто проигнорируйте это письмо.</p>\
         </body></html>"
    );
    (text, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bodies_contain_code_and_escape_shop_name() {
        let (text, html) = login_code_bodies("Чай & <Ко>", "123456");
        assert!(text.contains("123456"));
        assert!(text.contains("Чай & <Ко>"));
        assert!(html.contains("123456"));
        assert!(html.contains("Чай &amp; &lt;Ко&gt;"));
    }
}
