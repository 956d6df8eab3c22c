//! Business logic services for the shop.
//!
//! # Services
//!
//! - `checkout` - Order creation from cart or inline items
//! - `email` - SMTP delivery of login codes
//! - `feed` - Yandex YML catalog feed
//! - `sitemap` - `sitemap.xml`
//! - `sms` - sms.ru delivery of login codes
//! - `uploads` - Admin image uploads
//! - `verification` - Login code generation and delivery
//! - `yookassa` - Payment gateway client

pub mod checkout;
pub mod email;
pub mod feed;
pub mod sitemap;
pub mod sms;
pub mod uploads;
pub mod verification;
pub mod xml;
pub mod yookassa;
