//! # Witness Shared Library
//!
//! Account, token and webhook logic shared by the Witness API server and its command-line
//! tools.
//!
//! ## Module Organization
//!
//! - `db`: connection pool, migrations and the observed `Database` handle
//! - `models`: users, API tokens and webhook subscriptions
//! - `auth`: passwords, sessions, reset links and API tokens
//! - `mail`: outbound email messages and the `Mailer` capability
//! - `http`: the outbound `HttpClient` capability
//! - `webhooks`: signed webhook delivery
//! - `testing`: fixtures, query counting, HTTP mock and mail outbox (`test-support`)

pub mod auth;
pub mod db;
pub mod http;
pub mod mail;
pub mod models;
pub mod webhooks;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

/// Current version of the Witness shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
