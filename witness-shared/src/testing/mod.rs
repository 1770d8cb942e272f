//! Test support
//!
//! Compiled for this crate's unit tests and, through the `test-support` feature, for the
//! API crate's integration tests.
//!
//! - [`factories`]: the [`Fixtures`](factories::Fixtures) provider and model factories
//! - [`queries`]: [`QueryCounter`](queries::QueryCounter) statement-count assertions
//! - [`http_mock`]: [`MockHttpClient`](http_mock::MockHttpClient) for outbound HTTP
//! - [`outbox`]: [`Outbox`](outbox::Outbox), an in-memory [`Mailer`](crate::mail::Mailer)

pub mod factories;
pub mod http_mock;
pub mod outbox;
pub mod queries;
