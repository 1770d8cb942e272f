/// User model and database operations
///
/// Users log in with their email address. An account created through sign-up starts active
/// and unconfirmed with an unusable password; following the emailed link sets a password and
/// confirms the address, which issues the user's API token.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(254) NOT NULL,            -- unique on LOWER(email)
///     first_name VARCHAR(30) NOT NULL DEFAULT '',
///     last_name VARCHAR(30) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255) NOT NULL,
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     deactivated_at TIMESTAMPTZ,
///     email_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use witness_shared::db::Database;
/// use witness_shared::models::user::{NewUser, User};
///
/// # async fn example(db: Database) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create(&db, NewUser::new("person@Example.COM").password("s3cret-pass")).await?;
/// assert_eq!(user.email, "person@example.com");
///
/// let found = User::find_by_email(&db, "PERSON@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::api_token::ApiToken;
use super::error::ModelError;
use crate::auth::password::{hash_password, is_usable_password, make_unusable_password, verify_password};
use crate::db::Database;

/// A user account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Login identifier, domain part lower-cased
    pub email: String,

    pub first_name: String,
    pub last_name: String,

    /// Argon2id PHC string, or an unusable marker starting with `!`
    #[serde(skip)]
    pub password_hash: String,

    pub is_staff: bool,
    pub is_superuser: bool,

    /// Inactive users cannot log in or reset their password
    pub is_active: bool,

    /// Set when the account was deactivated
    pub deactivated_at: Option<DateTime<Utc>>,

    pub email_confirmed: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
///
/// Flags left as `None` take the column defaults (active, not staff, not superuser,
/// unconfirmed). A `None` password stores an unusable password.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub email_confirmed: Option<bool>,
}

impl NewUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn confirmed(mut self, email_confirmed: bool) -> Self {
        self.email_confirmed = Some(email_confirmed);
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn staff(mut self, is_staff: bool) -> Self {
        self.is_staff = Some(is_staff);
        self
    }

    pub fn superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = Some(is_superuser);
        self
    }
}

/// Editable profile fields
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Lower-cases the domain part of an email address
///
/// The local part is left alone; lookups compare the whole address case-insensitively.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

impl User {
    /// Local part of the email address
    pub fn short_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }

    /// "First Last" when both names are set, otherwise [`short_name`](Self::short_name)
    pub fn full_name(&self) -> String {
        if !self.first_name.is_empty() && !self.last_name.is_empty() {
            format!("{} {}", self.first_name, self.last_name).trim().to_string()
        } else {
            self.short_name().to_string()
        }
    }

    /// Whether a password has been set
    pub fn has_usable_password(&self) -> bool {
        is_usable_password(&self.password_hash)
    }

    /// Verifies `password` against the stored hash
    ///
    /// Malformed hashes are treated as a mismatch.
    pub fn check_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash).unwrap_or_else(|e| {
            tracing::warn!(user_id = %self.id, error = %e, "Stored password hash is malformed");
            false
        })
    }

    /// Creates a user
    ///
    /// The email is normalized and the password hashed. Creating an already confirmed user
    /// issues an API token in the same transaction.
    ///
    /// # Errors
    ///
    /// - `ModelError::EmailRequired` if the email is blank
    /// - `ModelError::DuplicateEmail` if the address is taken (in any case)
    pub async fn create(db: &Database, data: NewUser) -> Result<Self, ModelError> {
        let email = normalize_email(&data.email);
        if email.is_empty() {
            return Err(ModelError::EmailRequired);
        }

        let password_hash = match data.password.as_deref() {
            Some(password) => hash_password(password)?,
            None => make_unusable_password(),
        };
        let is_active = data.is_active.unwrap_or(true);

        let mut tx = db.begin().await?;
        let user = sqlx::query_as::<_, User>(db.statement(
            r#"
            INSERT INTO users (email, first_name, last_name, password_hash, is_active,
                               is_staff, is_superuser, email_confirmed, deactivated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $5 THEN NULL ELSE NOW() END)
            RETURNING id, email, first_name, last_name, password_hash, is_staff, is_superuser,
                      is_active, deactivated_at, email_confirmed, last_login_at,
                      created_at, updated_at
            "#,
        ))
        .bind(email)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(password_hash)
        .bind(is_active)
        .bind(data.is_staff.unwrap_or(false))
        .bind(data.is_superuser.unwrap_or(false))
        .bind(data.email_confirmed.unwrap_or(false))
        .fetch_one(&mut *tx)
        .await?;

        if user.email_confirmed {
            ApiToken::regenerate_with(db, &mut *tx, user.id).await?;
        }
        tx.commit().await?;

        Ok(user)
    }

    /// Creates a confirmed staff superuser
    ///
    /// Staff, superuser and confirmation default to true; explicitly clearing either
    /// privilege is rejected.
    pub async fn create_superuser(db: &Database, mut data: NewUser) -> Result<Self, ModelError> {
        if !*data.is_staff.get_or_insert(true) {
            return Err(ModelError::SuperuserMustBeStaff);
        }
        if !*data.is_superuser.get_or_insert(true) {
            return Err(ModelError::SuperuserMustBeSuperuser);
        }
        data.email_confirmed.get_or_insert(true);

        Self::create(db, data).await
    }

    pub async fn find_by_id(db: &Database, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(db.statement(
            r#"
            SELECT id, email, first_name, last_name, password_hash, is_staff, is_superuser,
                   is_active, deactivated_at, email_confirmed, last_login_at,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(db.pool())
        .await
    }

    /// Finds a user by email address, ignoring case
    pub async fn find_by_email(db: &Database, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(db.statement(
            r#"
            SELECT id, email, first_name, last_name, password_hash, is_staff, is_superuser,
                   is_active, deactivated_at, email_confirmed, last_login_at,
                   created_at, updated_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        ))
        .bind(email.trim())
        .fetch_optional(db.pool())
        .await
    }

    /// Saves the editable profile fields
    ///
    /// # Errors
    ///
    /// `ModelError::DuplicateEmail` if another account already uses the new address.
    pub async fn update_profile(
        db: &Database,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Self, ModelError> {
        let email = normalize_email(&update.email);
        if email.is_empty() {
            return Err(ModelError::EmailRequired);
        }

        let user = sqlx::query_as::<_, User>(db.statement(
            r#"
            UPDATE users
            SET email = $2, first_name = $3, last_name = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, first_name, last_name, password_hash, is_staff, is_superuser,
                      is_active, deactivated_at, email_confirmed, last_login_at,
                      created_at, updated_at
            "#,
        ))
        .bind(id)
        .bind(email)
        .bind(update.first_name)
        .bind(update.last_name)
        .fetch_one(db.pool())
        .await?;

        Ok(user)
    }

    /// Hashes and stores a new password
    ///
    /// Existing sessions and outstanding reset links stop working because both are bound to
    /// the old hash.
    pub async fn set_password(db: &Database, id: Uuid, password: &str) -> Result<Self, ModelError> {
        let password_hash = hash_password(password)?;

        let user = sqlx::query_as::<_, User>(db.statement(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, first_name, last_name, password_hash, is_staff, is_superuser,
                      is_active, deactivated_at, email_confirmed, last_login_at,
                      created_at, updated_at
            "#,
        ))
        .bind(id)
        .bind(password_hash)
        .fetch_one(db.pool())
        .await?;

        Ok(user)
    }

    /// Marks the email address as confirmed
    ///
    /// Only the false to true transition issues an API token, in the same transaction as the
    /// update. Returns `true` if the user was unconfirmed before the call.
    pub async fn confirm_email(db: &Database, id: Uuid) -> Result<bool, ModelError> {
        let mut tx = db.begin().await?;
        let confirmed = sqlx::query(db.statement(
            r#"
            UPDATE users
            SET email_confirmed = TRUE, updated_at = NOW()
            WHERE id = $1 AND NOT email_confirmed
            "#,
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if confirmed {
            ApiToken::regenerate_with(db, &mut *tx, id).await?;
        }
        tx.commit().await?;

        Ok(confirmed)
    }

    /// Deactivates the account, keeping the row
    ///
    /// The deactivation time is only stamped on the first call.
    pub async fn deactivate(db: &Database, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(db.statement(
            r#"
            UPDATE users
            SET is_active = FALSE,
                deactivated_at = COALESCE(deactivated_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .execute(db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a successful login and returns the new timestamp
    pub async fn update_last_login(db: &Database, id: Uuid) -> Result<DateTime<Utc>, sqlx::Error> {
        let (last_login_at,): (DateTime<Utc>,) = sqlx::query_as(db.statement(
            "UPDATE users SET last_login_at = NOW() WHERE id = $1 RETURNING last_login_at",
        ))
        .bind(id)
        .fetch_one(db.pool())
        .await?;

        Ok(last_login_at)
    }

    pub async fn count(db: &Database) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(db.statement("SELECT COUNT(*) FROM users"))
            .fetch_one(db.pool())
            .await?;

        Ok(count)
    }
}
