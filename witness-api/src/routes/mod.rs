/// Route handlers
///
/// - `pages`: home page and the 404 fallback
/// - `health`: health check
/// - `accounts`: sign-up, login, logout, account edit
/// - `password`: password reset, set-password links, password change
/// - `tokens`: API token reset
/// - `webhooks`: webhook subscription API

pub mod accounts;
pub mod health;
pub mod pages;
pub mod password;
pub mod tokens;
pub mod webhooks;

use axum::Extension;
use witness_shared::{auth::context::AuthContext, models::user::User};

/// Optional caller, as inserted by the authentication middleware
pub type MaybeAuth = Option<Extension<AuthContext>>;

pub(crate) fn current_user(auth: &MaybeAuth) -> Option<&User> {
    auth.as_ref().map(|Extension(context)| &context.user)
}
