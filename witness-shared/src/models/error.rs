/// Errors raised by model operations
///
/// Most model functions only fail on the database; account creation and profile updates
/// additionally reject input that violates account invariants.

use crate::auth::password::PasswordError;

/// Name of the case-insensitive unique index on `users.email`
pub const USERS_EMAIL_UNIQUE: &str = "users_email_unique";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Email address is required")]
    EmailRequired,

    #[error("A user with that email address already exists.")]
    DuplicateEmail,

    #[error("Superuser must have is_staff=True.")]
    SuperuserMustBeStaff,

    #[error("Superuser must have is_superuser=True.")]
    SuperuserMustBeSuperuser,

    #[error("Unknown webhook event type: {0}")]
    UnknownEventType(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() && db_err.constraint() == Some(USERS_EMAIL_UNIQUE) {
                return ModelError::DuplicateEmail;
            }
        }
        ModelError::Database(err)
    }
}
