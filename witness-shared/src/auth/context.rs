/// Authenticated request context
///
/// The API's authentication middleware resolves a session cookie or an
/// `Authorization: Token` header to a user and inserts an [`AuthContext`] into the request
/// extensions. Handlers extract it with `Extension<AuthContext>`.

use serde::Serialize;

use crate::models::user::User;

/// How the request proved who it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Browser session cookie
    Session,

    /// `Authorization: Token <key>` header
    Token,
}

/// Authentication context added to request extensions
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The authenticated, active user
    pub user: User,

    /// Authentication method used
    pub method: AuthMethod,
}

impl AuthContext {
    pub fn from_session(user: User) -> Self {
        Self {
            user,
            method: AuthMethod::Session,
        }
    }

    pub fn from_token(user: User) -> Self {
        Self {
            user,
            method: AuthMethod::Token,
        }
    }

    /// Whether the request came from a browser session
    ///
    /// Only session-authenticated requests are subject to the cross-site origin check.
    pub fn is_session(&self) -> bool {
        self.method == AuthMethod::Session
    }
}
