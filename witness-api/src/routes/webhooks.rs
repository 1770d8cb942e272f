/// Webhook subscription endpoints
///
/// # Endpoints
///
/// - `GET /webhooks` - List the caller's subscriptions
/// - `POST /webhooks` - Create a subscription
/// - `GET /webhooks/:id` - Get one subscription
/// - `DELETE /webhooks/:id` - Delete a subscription
///
/// Subscriptions belong to exactly one user; someone else's subscription answers `404`
/// exactly like a missing one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use witness_shared::{
    auth::context::AuthContext,
    models::webhook::{EventType, NewWebhookSubscription, WebhookSubscription},
};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    forms::FormErrors,
};

/// Create subscription request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    /// Where events are POSTed; http or https
    #[validate(
        length(max = 2000, message = "Ensure this value has at most 2000 characters."),
        url(message = "Enter a valid URL.")
    )]
    pub callback_url: String,

    /// Defaults to `ARCHIVE_CREATED`
    #[serde(default)]
    pub event_type: Option<String>,
}

impl CreateSubscriptionRequest {
    /// Validates the request and resolves the event type
    fn check(&self) -> Result<EventType, FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };

        if errors.field("callback_url").is_empty() {
            let scheme_ok = url::Url::parse(&self.callback_url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !scheme_ok {
                errors.add("callback_url", "Enter a valid URL.");
            }
        }

        let event_type = match self.event_type.as_deref() {
            None => EventType::default(),
            Some(name) => EventType::try_from(name.to_string()).unwrap_or_else(|_| {
                errors.add("event_type", format!("\"{}\" is not a valid choice.", name));
                EventType::default()
            }),
        };

        errors.into_result().map(|()| event_type)
    }
}

/// List the caller's subscriptions, newest first
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<WebhookSubscription>>> {
    let subscriptions = WebhookSubscription::list_by_user(&state.db, auth.user.id).await?;
    Ok(Json(subscriptions))
}

/// Create a subscription
///
/// # Request
///
/// ```json
/// { "callback_url": "https://example.com/hooks", "event_type": "ARCHIVE_CREATED" }
/// ```
///
/// # Response
///
/// The subscription, including the generated `signing_key` used for
/// `X-Hook-Signature`.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: invalid URL or unknown event type
pub async fn create_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> ApiResult<Json<WebhookSubscription>> {
    let event_type = req
        .check()
        .map_err(|errors| ApiError::ValidationError(errors.into_details()))?;

    let subscription = WebhookSubscription::create(
        &state.db,
        NewWebhookSubscription {
            user_id: auth.user.id,
            event_type,
            callback_url: req.callback_url,
            signing_key: None,
        },
    )
    .await?;

    tracing::info!(
        user_id = %auth.user.id,
        subscription_id = %subscription.id,
        event_type = %subscription.event_type,
        "Created webhook subscription"
    );

    Ok(Json(subscription))
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WebhookSubscription>> {
    WebhookSubscription::find_for_user(&state.db, id, auth.user.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Subscription not found".to_string()))
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !WebhookSubscription::delete_for_user(&state.db, id, auth.user.id).await? {
        return Err(ApiError::NotFound("Subscription not found".to_string()));
    }

    tracing::info!(user_id = %auth.user.id, subscription_id = %id, "Deleted webhook subscription");
    Ok(StatusCode::NO_CONTENT)
}
