/// Single-use password reset and email confirmation tokens
///
/// The link emailed on sign-up and on password reset is `/reset/{uid}/{token}`. The token is
/// `{timestamp}-{signature}` where the timestamp is base36 Unix seconds and the signature is
/// a truncated HMAC-SHA256 over the user's ID, password hash, last login time, email and the
/// timestamp.
///
/// No token state is stored. A token stops verifying once any signed field changes: setting
/// the password changes the hash, and logging in changes the last login time, so each link
/// works at most once.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use uuid::Uuid;
/// use witness_shared::auth::reset_token::{check_token, make_token, TokenSubject};
///
/// let subject = TokenSubject {
///     user_id: Uuid::new_v4(),
///     password_hash: "!unusable",
///     last_login_at: None,
///     email: "user@example.edu",
/// };
///
/// let secret = "a-secret-key-that-is-at-least-32-bytes";
/// let token = make_token(secret, &subject, Utc::now());
/// assert!(check_token(secret, &subject, &token, 3600, Utc::now()));
/// ```

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use super::api_token::constant_time_compare;

/// Default link lifetime (three days)
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 259_200;

/// Hex characters of the signature kept in the token
const SIGNATURE_LENGTH: usize = 32;

/// The user state a token is bound to
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub user_id: Uuid,
    pub password_hash: &'a str,
    pub last_login_at: Option<DateTime<Utc>>,
    pub email: &'a str,
}

/// Issues a token for `subject` stamped with `now`
pub fn make_token(secret: &str, subject: &TokenSubject<'_>, now: DateTime<Utc>) -> String {
    make_token_with_timestamp(secret, subject, now.timestamp())
}

/// Checks a token against the subject's current state
///
/// Fails for malformed tokens, tokens from the future, tokens older than
/// `timeout_seconds`, and tokens whose signed state no longer matches.
pub fn check_token(
    secret: &str,
    subject: &TokenSubject<'_>,
    token: &str,
    timeout_seconds: i64,
    now: DateTime<Utc>,
) -> bool {
    let Some((ts_b36, _)) = token.split_once('-') else {
        return false;
    };

    let Some(timestamp) = base36_decode(ts_b36) else {
        return false;
    };

    let expected = make_token_with_timestamp(secret, subject, timestamp);
    if !constant_time_compare(&expected, token) {
        return false;
    }

    let age = now.timestamp() - timestamp;
    (0..=timeout_seconds).contains(&age)
}

/// Encodes a user ID for the reset URL
pub fn encode_uid(user_id: Uuid) -> String {
    user_id.simple().to_string()
}

/// Decodes the user ID segment of a reset URL
pub fn decode_uid(uid: &str) -> Option<Uuid> {
    Uuid::try_parse(uid).ok()
}

fn make_token_with_timestamp(secret: &str, subject: &TokenSubject<'_>, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");

    let last_login = subject
        .last_login_at
        .map(|t| t.timestamp_micros().to_string())
        .unwrap_or_default();

    mac.update(b"reset:");
    mac.update(subject.user_id.as_bytes());
    mac.update(subject.password_hash.as_bytes());
    mac.update(b"|");
    mac.update(last_login.as_bytes());
    mac.update(b"|");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b"|");
    mac.update(subject.email.as_bytes());

    let signature = hex::encode(mac.finalize().into_bytes());
    format!("{}-{}", base36_encode(timestamp), &signature[..SIGNATURE_LENGTH])
}

fn base36_encode(value: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value <= 0 {
        return "0".to_string();
    }

    let mut n = value as u64;
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();

    String::from_utf8(out).unwrap_or_default()
}

fn base36_decode(value: &str) -> Option<i64> {
    // 13 base36 digits already overflow i64
    if value.is_empty() || value.len() > 12 {
        return None;
    }
    i64::from_str_radix(value, 36).ok()
}
