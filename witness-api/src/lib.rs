//! # Witness server library
//!
//! HTTP surface of the Witness account service.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `cli`: Command-line interface
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `forms`: HTML form input and validation
//! - `middleware`: Authentication, CSRF, security headers, error pages
//! - `routes`: Route handlers
//! - `templates`: HTML pages

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod routes;
pub mod templates;
