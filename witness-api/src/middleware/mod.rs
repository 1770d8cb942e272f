/// Middleware for the server
///
/// - `auth`: resolves the caller, plus the login and API guards
/// - `csrf`: origin check for state-changing browser requests
/// - `error_pages`: HTML error pages and panic recovery
/// - `security`: security headers

pub mod auth;
pub mod csrf;
pub mod error_pages;
pub mod security;
