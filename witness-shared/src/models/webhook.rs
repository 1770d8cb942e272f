/// Webhook subscription model and database operations
///
/// A subscription asks for an HTTP callback whenever an event of its type happens for its
/// owner. Every delivery is signed with the subscription's own key so receivers can check
/// where it came from.
///
/// # Security
///
/// - Signing keys are 32 random bytes, hex-encoded, generated on creation
/// - Each delivery carries `X-Hook-Signature: sha256=<hex hmac>` over the request body
/// - Keys are returned to the owner when the subscription is created or read
///
/// # Schema
///
/// ```sql
/// CREATE TABLE webhook_subscriptions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     event_type VARCHAR(32) NOT NULL DEFAULT 'ARCHIVE_CREATED',
///     callback_url VARCHAR(2048) NOT NULL,
///     signing_key VARCHAR(512) NOT NULL,
///     signing_key_algorithm VARCHAR(32) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use witness_shared::db::Database;
/// use witness_shared::models::webhook::{EventType, NewWebhookSubscription, WebhookSubscription};
/// use uuid::Uuid;
///
/// # async fn example(db: Database, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let subscription = WebhookSubscription::create(&db, NewWebhookSubscription {
///     user_id,
///     event_type: EventType::ArchiveCreated,
///     callback_url: "https://webhookservice.com?hookid=1234".to_string(),
///     signing_key: None,
/// }).await?;
///
/// let signature = subscription.generate_signature(b"{}");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use super::error::ModelError;
use crate::db::Database;

/// Algorithm name stored alongside generated keys
pub const SIGNING_KEY_ALGORITHM: &str = "sha256";

/// Events a subscription can listen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "ARCHIVE_CREATED")]
    ArchiveCreated,
}

impl EventType {
    pub const ALL: [EventType; 1] = [EventType::ArchiveCreated];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ArchiveCreated => "ARCHIVE_CREATED",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            EventType::ArchiveCreated => "Archive Created",
        }
    }
}

impl Default for EventType {
    fn default() -> Self {
        EventType::ArchiveCreated
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for EventType {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EventType::ALL
            .into_iter()
            .find(|event| event.as_str() == value)
            .ok_or(ModelError::UnknownEventType(value))
    }
}

/// A user's subscription to an event type
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WebhookSubscription {
    pub id: Uuid,

    /// Owner
    #[serde(skip_serializing)]
    pub user_id: Uuid,

    #[sqlx(try_from = "String")]
    pub event_type: EventType,

    pub callback_url: String,

    /// Hex-encoded HMAC key
    pub signing_key: String,

    /// Always `sha256` for generated keys
    pub signing_key_algorithm: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a subscription
///
/// `signing_key` is `(key, algorithm)`; when absent a new key is generated.
#[derive(Debug, Clone)]
pub struct NewWebhookSubscription {
    pub user_id: Uuid,
    pub event_type: EventType,
    pub callback_url: String,
    pub signing_key: Option<(String, String)>,
}

/// Generates a signing key and returns it with its algorithm name
pub fn generate_signing_key() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    (hex::encode(bytes), SIGNING_KEY_ALGORITHM.to_string())
}

impl WebhookSubscription {
    /// Signs a delivery payload with this subscription's key
    ///
    /// Returns the hex-encoded HMAC-SHA256 of `payload`.
    pub fn generate_signature(&self, payload: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.signing_key.as_bytes())
            .expect("HMAC can take key of any size");

        mac.update(payload);

        hex::encode(mac.finalize().into_bytes())
    }

    /// Value for the `X-Hook-Signature` header
    pub fn signature_header(&self, payload: &[u8]) -> String {
        format!("{}={}", self.signing_key_algorithm, self.generate_signature(payload))
    }

    /// Creates a subscription, generating a signing key unless one is provided
    pub async fn create(db: &Database, data: NewWebhookSubscription) -> Result<Self, sqlx::Error> {
        let (signing_key, algorithm) = match data.signing_key {
            Some((key, algorithm)) if !key.is_empty() && !algorithm.is_empty() => (key, algorithm),
            _ => generate_signing_key(),
        };

        sqlx::query_as::<_, WebhookSubscription>(db.statement(
            r#"
            INSERT INTO webhook_subscriptions (user_id, event_type, callback_url, signing_key, signing_key_algorithm)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, event_type, callback_url, signing_key, signing_key_algorithm,
                      created_at, updated_at
            "#,
        ))
        .bind(data.user_id)
        .bind(data.event_type.as_str())
        .bind(data.callback_url)
        .bind(signing_key)
        .bind(algorithm)
        .fetch_one(db.pool())
        .await
    }

    pub async fn find_by_id(db: &Database, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WebhookSubscription>(db.statement(
            r#"
            SELECT id, user_id, event_type, callback_url, signing_key, signing_key_algorithm,
                   created_at, updated_at
            FROM webhook_subscriptions
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(db.pool())
        .await
    }

    /// Finds a subscription only if `user_id` owns it
    pub async fn find_for_user(
        db: &Database,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, WebhookSubscription>(db.statement(
            r#"
            SELECT id, user_id, event_type, callback_url, signing_key, signing_key_algorithm,
                   created_at, updated_at
            FROM webhook_subscriptions
            WHERE id = $1 AND user_id = $2
            "#,
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db.pool())
        .await
    }

    /// Lists a user's subscriptions, newest first
    pub async fn list_by_user(db: &Database, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WebhookSubscription>(db.statement(
            r#"
            SELECT id, user_id, event_type, callback_url, signing_key, signing_key_algorithm,
                   created_at, updated_at
            FROM webhook_subscriptions
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#,
        ))
        .bind(user_id)
        .fetch_all(db.pool())
        .await
    }

    /// Subscriptions that should hear about `event` for `user_id`
    pub async fn list_for_event(
        db: &Database,
        user_id: Uuid,
        event: EventType,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WebhookSubscription>(db.statement(
            r#"
            SELECT id, user_id, event_type, callback_url, signing_key, signing_key_algorithm,
                   created_at, updated_at
            FROM webhook_subscriptions
            WHERE user_id = $1 AND event_type = $2
            ORDER BY created_at DESC, id
            "#,
        ))
        .bind(user_id)
        .bind(event.as_str())
        .fetch_all(db.pool())
        .await
    }

    /// Deletes a subscription owned by `user_id`; `false` if there was none
    pub async fn delete_for_user(db: &Database, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(db.statement(
            "DELETE FROM webhook_subscriptions WHERE id = $1 AND user_id = $2",
        ))
        .bind(id)
        .bind(user_id)
        .execute(db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(signing_key: &str) -> WebhookSubscription {
        WebhookSubscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_type: EventType::ArchiveCreated,
            callback_url: "https://webhookservice.com?hookid=1234".to_string(),
            signing_key: signing_key.to_string(),
            signing_key_algorithm: SIGNING_KEY_ALGORITHM.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_signing_key() {
        let (key1, algorithm) = generate_signing_key();
        let (key2, _) = generate_signing_key();

        assert_eq!(key1.len(), 64);
        assert_eq!(algorithm, "sha256");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_generate_signature() {
        let webhook = subscription("key");

        let sig1 = webhook.generate_signature(b"test payload");
        let sig2 = webhook.generate_signature(b"test payload");

        assert_eq!(sig1.len(), 64);
        assert_eq!(sig1, sig2);
        assert_ne!(sig1, webhook.generate_signature(b"different payload"));
        assert_ne!(sig1, subscription("other").generate_signature(b"test payload"));
    }

    #[test]
    fn test_signature_matches_known_vector() {
        // RFC 4231 test case 2
        let webhook = subscription("Jefe");
        assert_eq!(
            webhook.generate_signature(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
        assert!(webhook
            .signature_header(b"what do ya want for nothing?")
            .starts_with("sha256=5bdcc146"));
    }

    #[test]
    fn test_event_type_conversions() {
        assert_eq!(
            EventType::try_from("ARCHIVE_CREATED".to_string()).unwrap(),
            EventType::ArchiveCreated
        );
        assert!(EventType::try_from("archive_created".to_string()).is_err());
        assert_eq!(serde_json::to_value(EventType::ArchiveCreated).unwrap(), "ARCHIVE_CREATED");
        assert_eq!(EventType::default().label(), "Archive Created");
    }

    #[test]
    fn test_serialized_subscription_hides_owner() {
        let json = serde_json::to_value(subscription("key")).unwrap();
        assert!(json.get("user_id").is_none());
        assert_eq!(json["event_type"], "ARCHIVE_CREATED");
        assert_eq!(json["signing_key_algorithm"], "sha256");
    }
}
