/// Password hashing and validation
///
/// Passwords are hashed with Argon2id (64 MB, 3 passes, 4 lanes) and stored as PHC strings.
/// Accounts created through sign-up have no password until the confirmation link is used;
/// they carry an *unusable* hash (a `!` followed by random characters) that never verifies.
///
/// # Example
///
/// ```
/// use witness_shared::auth::password::{hash_password, make_unusable_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("correct horse")?;
/// assert!(verify_password("correct horse", &hash)?);
///
/// let unusable = make_unusable_password();
/// assert!(!verify_password("anything", &unusable)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use rand::distributions::{Alphanumeric, DistString};

/// Prefix marking a hash that can never match a password
pub const UNUSABLE_PASSWORD_PREFIX: char = '!';

/// Minimum password length accepted by [`validate_password`]
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Passwords rejected outright
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890", "qwerty123",
    "qwertyuiop", "iloveyou", "sunshine", "princess", "football", "baseball", "welcome1",
    "letmein1", "abc12345", "trustno1", "passw0rd", "superman", "whatever",
];

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password with Argon2id
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the parameters are rejected or hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Unusable hashes never verify. Argon2 comparison is constant-time.
///
/// # Errors
///
/// Returns an error if a usable hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    if !is_usable_password(hash) {
        return Ok(false);
    }

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Returns a random hash value that no password verifies against
pub fn make_unusable_password() -> String {
    format!(
        "{}{}",
        UNUSABLE_PASSWORD_PREFIX,
        Alphanumeric.sample_string(&mut rand::thread_rng(), 40)
    )
}

/// Whether `hash` could ever verify a password
pub fn is_usable_password(hash: &str) -> bool {
    !hash.is_empty() && !hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

/// Checks a new password against the account's password policy
///
/// The policy rejects passwords that are too short, entirely numeric, on the common
/// password list, or equal to one of the user's own attributes (email, email local part,
/// first name, last name).
///
/// # Returns
///
/// Every failed rule as a human-readable message, or `Ok(())`.
///
/// # Example
///
/// ```
/// use witness_shared::auth::password::validate_password;
///
/// assert!(validate_password("anewpass", &["user@example.edu", "Test", "User"]).is_ok());
/// assert!(validate_password("1234", &[]).is_err());
/// ```
pub fn validate_password(password: &str, user_attributes: &[&str]) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let lowered = password.to_lowercase();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        errors.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.".to_string());
    }

    let similar = user_attributes
        .iter()
        .flat_map(|attribute| {
            let attribute = attribute.trim().to_lowercase();
            let local_part = attribute.split('@').next().map(str::to_string);
            std::iter::once(attribute).chain(local_part)
        })
        .any(|attribute| !attribute.is_empty() && attribute == lowered);
    if similar {
        errors.push("The password is too similar to your personal information.".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_uses_argon2id_parameters() {
        let hash = hash_password("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password").unwrap();

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_malformed_hash() {
        assert!(verify_password("password", "invalid_hash").is_err());
        assert!(verify_password("password", "$argon2id$invalid").is_err());
    }

    #[test]
    fn test_unusable_password_never_verifies() {
        let unusable = make_unusable_password();

        assert!(unusable.starts_with('!'));
        assert!(!is_usable_password(&unusable));
        assert!(!verify_password("", &unusable).unwrap());
        assert!(!verify_password(&unusable, &unusable).unwrap());
        assert_ne!(unusable, make_unusable_password());
    }

    #[test]
    fn test_validate_password_accepts_reasonable_password() {
        assert!(validate_password("anewpass", &["user@example.edu", "Test", "User"]).is_ok());
    }

    #[test]
    fn test_validate_password_collects_every_failure() {
        let errors = validate_password("1234", &[]).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("too short"));
        assert!(errors[1].contains("entirely numeric"));
    }

    #[test]
    fn test_validate_password_rejects_common_and_personal() {
        assert!(validate_password("Password123", &[]).unwrap_err()[0].contains("too common"));

        let errors = validate_password("longusername", &["longusername@example.com"]).unwrap_err();
        assert!(errors[0].contains("personal information"));
    }
}
