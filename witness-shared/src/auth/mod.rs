/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing, unusable passwords and the password policy
/// - [`session`]: signed session tokens carried in the session cookie
/// - [`reset_token`]: single-use links for password reset and email confirmation
/// - [`api_token`]: API token generation and `Authorization: Token` parsing
/// - [`context`]: the per-request authentication context
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **Sessions**: HS256 tokens bound to the current password hash
/// - **Reset Links**: HMAC-SHA256 over mutable user state, no server-side storage
/// - **Constant-time Comparison**: all token checks use constant-time operations
///
/// # Example
///
/// ```
/// use witness_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod api_token;
pub mod context;
pub mod password;
pub mod reset_token;
pub mod session;
