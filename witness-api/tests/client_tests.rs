/// Tests for the session-aware test client itself
///
/// These run against a small stand-in router, so they need no database.

mod common;

use axum::{
    http::{header, HeaderMap},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use common::TestClient;
use uuid::Uuid;
use witness_api::config::Config;
use witness_shared::models::user::User;

fn config() -> Config {
    Config::for_tests("postgresql://localhost/unused")
}

fn user(email: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: format!("!{}", email),
        is_staff: false,
        is_superuser: false,
        is_active: true,
        deactivated_at: None,
        email_confirmed: true,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    }
}

async fn echo_cookies(headers: HeaderMap) -> String {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn app() -> Router {
    Router::new()
        .route("/cookies", get(echo_cookies))
        .route(
            "/set",
            post(|| async { ([(header::SET_COOKIE, "sessionid=from-server; Path=/")], "ok") }),
        )
        .route(
            "/clear",
            post(|| async {
                (
                    [(header::SET_COOKIE, "sessionid=; Path=/; Max-Age=0")],
                    "ok",
                )
            }),
        )
        .route(
            "/bounce",
            get(|| async { axum::response::Redirect::to("/cookies") }),
        )
}

#[tokio::test]
async fn test_as_user_without_prior_session_leaves_none() {
    let mut client = TestClient::new(app(), config());
    let alice = user("alice@example.com");

    let response = client.get("/cookies").as_user(&alice).send().await;
    assert!(response.body.starts_with("sessionid="), "{}", response.body);

    assert_eq!(client.session(), None);
    let response = client.get("/cookies").send().await;
    assert_eq!(response.body, "");
}

#[tokio::test]
async fn test_as_user_restores_previous_session() {
    let mut client = TestClient::new(app(), config());
    client.set_session(Some("original".to_string()));

    let alice = user("alice@example.com");
    let bob = user("bob@example.com");

    let as_alice = client.get("/cookies").as_user(&alice).send().await.body;
    assert_eq!(client.session(), Some("original"));

    let as_bob = client.get("/cookies").as_user(&bob).send().await.body;
    assert_eq!(client.session(), Some("original"));

    assert_ne!(as_alice, as_bob);
    assert_ne!(as_alice, "sessionid=original");

    let plain = client.get("/cookies").send().await.body;
    assert_eq!(plain, "sessionid=original");
}

#[tokio::test]
async fn test_server_cookies_are_kept_and_cleared() {
    let mut client = TestClient::new(app(), config());

    client.post("/set").send().await;
    assert_eq!(client.session(), Some("from-server"));
    assert_eq!(client.get("/cookies").send().await.body, "sessionid=from-server");

    client.post("/clear").send().await;
    assert_eq!(client.session(), None);
}

#[tokio::test]
async fn test_cookie_set_during_impersonated_call_does_not_stick() {
    let mut client = TestClient::new(app(), config());

    client.post("/set").as_user(&user("alice@example.com")).send().await;

    assert_eq!(client.session(), None);
}

#[tokio::test]
async fn test_follow_records_redirect_chain() {
    let mut client = TestClient::new(app(), config());

    let response = client.get("/bounce").follow().send().await;

    assert!(response.status.is_success());
    assert_eq!(response.redirect_chain, ["/cookies"]);

    let response = client.get("/bounce").send().await;
    assert!(response.status.is_redirection());
    assert_eq!(response.location(), Some("/cookies"));
}
