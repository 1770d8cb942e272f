/// Authentication middleware
///
/// [`authenticate`] runs on every request. It resolves the caller from an
/// `Authorization: Token <key>` header or, failing that, from the session cookie, and
/// inserts an [`AuthContext`] into the request extensions. It never rejects a request;
/// the guards do that:
///
/// - [`require_login`] redirects anonymous visitors to `/login?next=<path>` (HTML pages)
/// - [`require_api_auth`] answers `401` JSON (API endpoints)
///
/// Sessions are signed tokens bound to the user's password hash, so changing the password
/// ends every other session.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use witness_shared::{
    auth::{
        api_token::{parse_authorization_header, TOKEN_SCHEME},
        context::AuthContext,
        session::{self, SessionClaims, SessionError},
    },
    models::{api_token::ApiToken, user::User},
};

use crate::{app::AppState, config::Config, error::ApiError, error::PageError};

/// Signs a session token for `user` under the configured secret and lifetime
pub fn session_token(config: &Config, user: &User) -> Result<String, SessionError> {
    let secret = &config.session.secret_key;
    let claims = SessionClaims::new(
        user.id,
        session::session_auth_hash(secret, &user.password_hash),
        config.session.cookie_age_seconds,
    );
    session::create_session_token(&claims, secret)
}

/// Session cookie carrying `token`
pub fn session_cookie(config: &Config, token: &str) -> Result<Cookie<'static>, SessionError> {
    let raw = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
        config.session.cookie_name,
        token,
        config.session.cookie_age_seconds,
        if config.api.production { "; Secure" } else { "" },
    );
    Cookie::parse(raw).map_err(|e| SessionError::CreateError(e.to_string()))
}

/// Adds a fresh session cookie for `user` to the jar
pub fn start_session(jar: CookieJar, config: &Config, user: &User) -> Result<CookieJar, SessionError> {
    let token = session_token(config, user)?;
    Ok(jar.add(session_cookie(config, &token)?))
}

/// Removes the session cookie
pub fn end_session(jar: CookieJar, config: &Config) -> CookieJar {
    jar.remove(Cookie::build(config.session.cookie_name.clone()).path("/"))
}

/// Whether the request uses the `Token` authorization scheme, valid key or not
pub fn has_token_header(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(' '))
        .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case(TOKEN_SCHEME))
}

async fn from_token(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthContext>, sqlx::Error> {
    let Some(key) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_authorization_header)
    else {
        return Ok(None);
    };

    let user = ApiToken::find_user_by_key(&state.db, key).await?;
    Ok(user.filter(|u| u.is_active).map(AuthContext::from_token))
}

async fn from_session(state: &AppState, jar: &CookieJar) -> Result<Option<AuthContext>, sqlx::Error> {
    let Some(cookie) = jar.get(&state.config.session.cookie_name) else {
        return Ok(None);
    };

    let secret = &state.config.session.secret_key;
    let claims = match session::validate_session_token(cookie.value(), secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session cookie");
            return Ok(None);
        }
    };

    let user = User::find_by_id(&state.db, claims.sub).await?;
    Ok(user
        .filter(|u| u.is_active && claims.matches_password(secret, &u.password_hash))
        .map(AuthContext::from_session))
}

/// Resolves the caller and inserts an [`AuthContext`] when one is found
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let resolved = match from_token(&state, req.headers()).await {
        Ok(None) if !has_token_header(req.headers()) => from_session(&state, &jar).await,
        other => other,
    };

    match resolved {
        Ok(Some(context)) => {
            tracing::debug!(user_id = %context.user.id, method = ?context.method, "Authenticated request");
            req.extensions_mut().insert(context);
        }
        Ok(None) => {}
        Err(e) => return PageError::from(e).into_response(),
    }

    next.run(req).await
}

/// Login URL that returns to `uri` afterwards
pub fn login_url(uri: &Uri) -> String {
    let next = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/login?next={}", encoded.replace("%2F", "/"))
}

/// Requires a browser session; anonymous visitors are sent to the login page
pub async fn require_login(req: Request, next: Next) -> Response {
    let has_session = req
        .extensions()
        .get::<AuthContext>()
        .is_some_and(AuthContext::is_session);

    if has_session {
        next.run(req).await
    } else {
        Redirect::to(&login_url(req.uri())).into_response()
    }
}

/// Requires a session or API token; anonymous callers get `401`
pub async fn require_api_auth(req: Request, next: Next) -> Response {
    if req.extensions().get::<AuthContext>().is_none() {
        return ApiError::Unauthorized("Authentication credentials were not provided.".to_string())
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config() -> Config {
        Config::for_tests("postgresql://localhost/test")
    }

    #[test]
    fn test_login_url_keeps_path_and_query() {
        assert_eq!(login_url(&Uri::from_static("/account")), "/login?next=/account");
        assert_eq!(
            login_url(&Uri::from_static("/account?tab=key")),
            "/login?next=/account%3Ftab%3Dkey"
        );
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(&config(), "abc.def.ghi").unwrap();

        assert_eq!(cookie.name(), "sessionid");
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), None);

        let mut production = config();
        production.api.production = true;
        let cookie = session_cookie(&production, "abc").unwrap();
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_has_token_header() {
        let mut headers = HeaderMap::new();
        assert!(!has_token_header(&headers));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(!has_token_header(&headers));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(has_token_header(&headers));
    }
}
