/// Integration tests for the JSON API: token reset and webhook subscriptions
///
/// These tests require a running PostgreSQL database (see `common`).

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;
use witness_api::routes::tokens::TokenResponse;
use witness_shared::models::{api_token::ApiToken, webhook::WebhookSubscription};

#[tokio::test]
async fn test_token_reset_issues_new_token() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };
    let user = ctx.fixtures.user().await;
    let before = ApiToken::find_by_user(&ctx.db, user.id).await.unwrap().unwrap();

    let response = ctx.client().post("/token-reset").as_user(&user).send().await;

    assert_eq!(response.status, StatusCode::OK);
    let body: TokenResponse = serde_json::from_str(&response.body).unwrap();
    let after = ApiToken::find_by_user(&ctx.db, user.id).await.unwrap().unwrap();

    assert_ne!(body.token, before.key);
    assert_eq!(body.token, after.key);
    assert_eq!(body.token.len(), 40);
}

#[tokio::test]
async fn test_token_reset_with_token_header_revokes_old_key() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };
    let user = ctx.fixtures.user().await;
    let old = ApiToken::find_by_user(&ctx.db, user.id).await.unwrap().unwrap();
    let mut client = ctx.client();

    let response = client.post("/token-reset").token(&old.key).send().await;
    assert_eq!(response.status, StatusCode::OK);
    let new_key = response.json()["token"].as_str().unwrap().to_string();

    let response = client.get("/webhooks").token(&old.key).send().await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = client.get("/webhooks").token(&new_key).send().await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_reset_requires_authentication() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };

    let response = ctx.client().post("/token-reset").send().await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json()["message"],
        "Authentication credentials were not provided."
    );
}

#[tokio::test]
async fn test_token_reset_rejects_get() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };
    let user = ctx.fixtures.user().await;
    let before = ApiToken::find_by_user(&ctx.db, user.id).await.unwrap().unwrap();

    let response = ctx.client().get("/token-reset").as_user(&user).send().await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    let after = ApiToken::find_by_user(&ctx.db, user.id).await.unwrap().unwrap();
    assert_eq!(before.key, after.key);
}

#[tokio::test]
async fn test_deactivated_user_token_is_refused() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };
    let user = ctx.fixtures.user().await;
    let token = ApiToken::find_by_user(&ctx.db, user.id).await.unwrap().unwrap();
    witness_shared::models::user::User::deactivate(&ctx.db, user.id)
        .await
        .unwrap();

    let response = ctx.client().post("/token-reset").token(&token.key).send().await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_subscription_lifecycle() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };
    let user = ctx.fixtures.user().await;
    let mut client = ctx.client();
    client.force_login(&user);

    let response = client
        .post_json("/webhooks", &json!({ "callback_url": "https://example.com/hooks" }))
        .send()
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let created = response.json();
    assert_eq!(created["event_type"], "ARCHIVE_CREATED");
    assert_eq!(created["callback_url"], "https://example.com/hooks");
    assert_eq!(created["signing_key_algorithm"], "sha256");
    assert!(created.get("user_id").is_none());
    let id = created["id"].as_str().unwrap().to_string();

    let listed = client.get("/webhooks").send().await.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());

    let fetched = client.get(&format!("/webhooks/{}", id)).send().await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json()["signing_key"], created["signing_key"]);

    let deleted = client.delete(&format!("/webhooks/{}", id)).send().await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let fetched = client.get(&format!("/webhooks/{}", id)).send().await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);
    assert_eq!(client.get("/webhooks").send().await.json(), json!([]));
}

#[tokio::test]
async fn test_webhook_validation_errors() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };
    let user = ctx.fixtures.user().await;
    let mut client = ctx.client();

    let response = client
        .post_json("/webhooks", &json!({ "callback_url": "ftp://example.com/hooks" }))
        .as_user(&user)
        .send()
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = response.json()["details"].clone();
    assert_eq!(details[0]["field"], "callback_url");

    let response = client
        .post_json(
            "/webhooks",
            &json!({ "callback_url": "https://example.com/hooks", "event_type": "NOPE" }),
        )
        .as_user(&user)
        .send()
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    assert!(WebhookSubscription::list_by_user(&ctx.db, user.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_other_users_subscriptions_are_hidden() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };
    let subscription = ctx.fixtures.webhook_subscription().await;
    let stranger = ctx.fixtures.user().await;
    let path = format!("/webhooks/{}", subscription.id);
    let mut client = ctx.client();

    let response = client.get(&path).as_user(&stranger).send().await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = client.delete(&path).as_user(&stranger).send().await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let listed = client.get("/webhooks").as_user(&stranger).send().await.json();
    assert_eq!(listed, json!([]));

    assert!(WebhookSubscription::find_by_id(&ctx.db, subscription.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_webhooks_require_authentication() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };
    let mut client = ctx.client();

    assert_eq!(client.get("/webhooks").send().await.status, StatusCode::UNAUTHORIZED);

    let response = client
        .get("/webhooks")
        .token("0000000000000000000000000000000000000000")
        .send()
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_requests_skip_origin_check() {
    let Some(ctx) = TestContext::try_new().await else {
        return;
    };
    let user = ctx.fixtures.user().await;
    let token = ApiToken::find_by_user(&ctx.db, user.id).await.unwrap().unwrap();

    let response = ctx
        .client()
        .post_json("/webhooks", &json!({ "callback_url": "https://example.com/hooks" }))
        .token(&token.key)
        .header("origin", "https://integrations.example")
        .send()
        .await;

    assert_eq!(response.status, StatusCode::OK);
}
