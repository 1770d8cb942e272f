/// Signed session tokens
///
/// A logged-in browser carries a session cookie whose value is an HS256 JWT. Besides the
/// user ID the token embeds a *session auth hash* derived from the user's password hash, so
/// changing the password invalidates every session issued before the change.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC-SHA256)
/// - **Expiration**: configurable, two weeks by default
/// - **Validation**: signature, expiration, issuer, and the session auth hash
///
/// # Example
///
/// ```
/// use witness_shared::auth::session::{create_session_token, session_auth_hash, validate_session_token, SessionClaims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-key-that-is-at-least-32-bytes";
/// let user_id = Uuid::new_v4();
/// let hash = session_auth_hash(secret, "$argon2id$...");
///
/// let token = create_session_token(&SessionClaims::new(user_id, hash.clone(), 3600), secret)?;
/// let claims = validate_session_token(&token, secret)?;
/// assert_eq!(claims.sub, user_id);
/// assert!(claims.matches_password(secret, "$argon2id$..."));
/// # Ok(())
/// # }
/// ```

use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use super::api_token::constant_time_compare;

/// Issuer claim on every session token
pub const SESSION_ISSUER: &str = "witness";

/// Default session lifetime (two weeks)
pub const DEFAULT_SESSION_AGE_SECONDS: i64 = 1_209_600;

/// Error type for session token operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to create session token: {0}")]
    CreateError(String),

    #[error("Session has expired")]
    Expired,

    #[error("Invalid session token: {0}")]
    Invalid(String),
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: Uuid,

    /// Always [`SESSION_ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Session auth hash at the time of login
    pub hash: String,
}

impl SessionClaims {
    /// Creates claims valid for `max_age_seconds` from now
    pub fn new(user_id: Uuid, auth_hash: String, max_age_seconds: i64) -> Self {
        let now = Utc::now().timestamp();

        Self {
            sub: user_id,
            iss: SESSION_ISSUER.to_string(),
            iat: now,
            exp: now + max_age_seconds,
            hash: auth_hash,
        }
    }

    /// Whether the session was issued for the user's current password
    pub fn matches_password(&self, secret: &str, password_hash: &str) -> bool {
        constant_time_compare(&self.hash, &session_auth_hash(secret, password_hash))
    }
}

/// Derives the session auth hash for a stored password hash
///
/// Returns hex-encoded HMAC-SHA256 keyed with the server secret.
pub fn session_auth_hash(secret: &str, password_hash: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(b"session:");
    mac.update(password_hash.as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

/// Signs session claims into a token string
pub fn create_session_token(claims: &SessionClaims, secret: &str) -> Result<String, SessionError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| SessionError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies a session token's signature, issuer and expiry
///
/// The session auth hash is not checked here because it needs the user row; callers load
/// the user and call [`SessionClaims::matches_password`].
pub fn validate_session_token(token: &str, secret: &str) -> Result<SessionClaims, SessionError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[SESSION_ISSUER]);
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid(e.to_string()),
        })
}
