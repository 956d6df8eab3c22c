//! Vitrina Core - Shared domain library.
//!
//! This crate provides the types used across all Vitrina components:
//! - `storefront` - Public shop API and admin API (one axum binary)
//! - `cli` - Command-line tools for migrations and user management
//! - `integration-tests` - Database and HTTP integration tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Repositories in the storefront crate feed it rows
//! and execute whatever it decides.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, phones and statuses
//! - [`address_book`] - Default-address planning for a user's address list

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address_book;
pub mod types;

pub use types::*;
