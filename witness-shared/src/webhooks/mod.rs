/// Webhook delivery
///
/// When an event happens for a user, every subscription of theirs for that event type gets
/// one signed POST. Deliveries are not retried; the caller receives a per-subscription
/// outcome and decides what to log.
///
/// # Payload
///
/// ```json
/// {
///   "event_type": "ARCHIVE_CREATED",
///   "subscription_id": "…",
///   "timestamp": "2024-01-01T00:00:00Z",
///   "data": { … }
/// }
/// ```
///
/// The body is signed with the subscription key and the signature sent as
/// `X-Hook-Signature: sha256=<hex>`.

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::Database;
use crate::http::{HttpClient, HttpRequest, Method};
use crate::models::webhook::{EventType, WebhookSubscription};

/// Header carrying the payload signature
pub const SIGNATURE_HEADER: &str = "X-Hook-Signature";

#[derive(Debug, Serialize)]
struct Payload<'a> {
    event_type: EventType,
    subscription_id: Uuid,
    timestamp: String,
    data: &'a serde_json::Value,
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub subscription_id: Uuid,

    /// Response status, if a response arrived
    pub status: Option<u16>,

    /// Transport or encoding error, if the request failed
    pub error: Option<String>,
}

impl DeliveryOutcome {
    /// 2xx response received
    pub fn succeeded(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

/// Builds the signed request for one subscription
pub fn build_request(
    subscription: &WebhookSubscription,
    data: &serde_json::Value,
) -> Result<HttpRequest, serde_json::Error> {
    let body = serde_json::to_vec(&Payload {
        event_type: subscription.event_type,
        subscription_id: subscription.id,
        timestamp: Utc::now().to_rfc3339(),
        data,
    })?;

    Ok(HttpRequest::new(Method::POST, &subscription.callback_url)
        .header("Content-Type", "application/json")
        .header(SIGNATURE_HEADER, subscription.signature_header(&body))
        .body(Bytes::from(body)))
}

/// Sends one event to one subscription
pub async fn deliver(
    http: &dyn HttpClient,
    subscription: &WebhookSubscription,
    data: &serde_json::Value,
) -> DeliveryOutcome {
    let request = match build_request(subscription, data) {
        Ok(request) => request,
        Err(e) => {
            return DeliveryOutcome {
                subscription_id: subscription.id,
                status: None,
                error: Some(e.to_string()),
            }
        }
    };

    let outcome = match http.request(request).await {
        Ok(response) => DeliveryOutcome {
            subscription_id: subscription.id,
            status: Some(response.status()),
            error: None,
        },
        Err(e) => DeliveryOutcome {
            subscription_id: subscription.id,
            status: None,
            error: Some(e.to_string()),
        },
    };

    if outcome.succeeded() {
        tracing::info!(subscription_id = %subscription.id, status = ?outcome.status, "Delivered webhook");
    } else {
        tracing::warn!(
            subscription_id = %subscription.id,
            status = ?outcome.status,
            error = ?outcome.error,
            "Webhook delivery failed"
        );
    }

    outcome
}

/// Delivers `event` to every matching subscription of `user_id`
///
/// A user without subscriptions results in no requests and an empty list.
pub async fn notify_subscribers(
    db: &Database,
    http: &dyn HttpClient,
    user_id: Uuid,
    event: EventType,
    data: &serde_json::Value,
) -> Result<Vec<DeliveryOutcome>, sqlx::Error> {
    let subscriptions = WebhookSubscription::list_for_event(db, user_id, event).await?;

    let mut outcomes = Vec::with_capacity(subscriptions.len());
    for subscription in &subscriptions {
        outcomes.push(deliver(http, subscription, data).await);
    }

    Ok(outcomes)
}
