/// API token utilities
///
/// Tokens authenticate programmatic clients via `Authorization: Token <key>`. A token is 40
/// lowercase hex characters drawn from 20 random bytes. Tokens are shown back to their owner
/// on the account page, so they are stored as issued; database operations live in
/// `models::api_token`.
///
/// # Example
///
/// ```
/// use witness_shared::auth::api_token::{generate_token, parse_authorization_header, validate_token_format};
///
/// let key = generate_token();
/// assert_eq!(key.len(), 40);
/// assert!(validate_token_format(&key));
///
/// let header = format!("Token {}", key);
/// assert_eq!(parse_authorization_header(&header), Some(key.as_str()));
/// ```

use rand::RngCore;

/// Number of random bytes behind each token
const TOKEN_BYTES: usize = 20;

/// Length of an encoded token
pub const TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// Authorization scheme for token authentication
pub const TOKEN_SCHEME: &str = "Token";

/// Generates a new random API token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Checks that `key` looks like a token without touching the database
pub fn validate_token_format(key: &str) -> bool {
    key.len() == TOKEN_LENGTH
        && key
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Extracts the key from an `Authorization: Token <key>` header value
///
/// The scheme is matched case-insensitively. Returns `None` for other schemes or a
/// malformed key.
pub fn parse_authorization_header(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(TOKEN_SCHEME) {
        return None;
    }

    let key = key.trim();
    validate_token_format(key).then_some(key)
}

/// Constant-time string comparison
///
/// Returns early only on a length mismatch; equal-length inputs are compared in full.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
