/// API token model
///
/// Each user holds at most one token. Tokens are issued when a user's email address is
/// confirmed and replaced on request from the account page or `POST /token-reset`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE api_tokens (
///     key VARCHAR(40) PRIMARY KEY,
///     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::user::User;
use crate::auth::api_token::generate_token;
use crate::db::Database;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApiToken {
    /// 40 lowercase hex characters
    pub key: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ApiToken {
    /// Issues a fresh token for `user_id`, replacing any existing one
    ///
    /// A single upsert on the `user_id` unique constraint, so concurrent calls never leave
    /// a user with two tokens and the previous key stops working as soon as this returns.
    pub async fn regenerate(db: &Database, user_id: Uuid) -> Result<Self, sqlx::Error> {
        Self::regenerate_with(db, db.pool(), user_id).await
    }

    /// [`regenerate`](Self::regenerate) on the caller's connection or transaction
    pub async fn regenerate_with<'e, E>(
        db: &Database,
        executor: E,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let token = sqlx::query_as::<_, ApiToken>(db.statement(
            r#"
            INSERT INTO api_tokens (key, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET key = EXCLUDED.key, created_at = NOW()
            RETURNING key, user_id, created_at
            "#,
        ))
        .bind(generate_token())
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        tracing::info!(user_id = %user_id, "Issued new API token");
        Ok(token)
    }

    pub async fn find_by_user(db: &Database, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ApiToken>(db.statement(
            "SELECT key, user_id, created_at FROM api_tokens WHERE user_id = $1",
        ))
        .bind(user_id)
        .fetch_optional(db.pool())
        .await
    }

    /// Resolves a token key to its owner
    ///
    /// Returns the user whatever their status; callers decide what an inactive owner means.
    pub async fn find_user_by_key(db: &Database, key: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(db.statement(
            r#"
            SELECT u.id, u.email, u.first_name, u.last_name, u.password_hash, u.is_staff,
                   u.is_superuser, u.is_active, u.deactivated_at, u.email_confirmed,
                   u.last_login_at, u.created_at, u.updated_at
            FROM api_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.key = $1
            "#,
        ))
        .bind(key)
        .fetch_optional(db.pool())
        .await
    }
}
