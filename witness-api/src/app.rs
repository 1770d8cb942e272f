/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum router with all
/// routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use witness_api::{app::AppState, config::Config};
/// use witness_shared::{db::Database, http::ReqwestHttpClient, mail::LogMailer};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = sqlx::PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(
///     Database::new(pool),
///     config,
///     Arc::new(LogMailer),
///     Arc::new(ReqwestHttpClient::new()?),
/// );
/// let app = witness_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        auth::{authenticate, require_api_auth, require_login},
        csrf::csrf_protect,
        error_pages::{handle_panic, render_error_pages},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use witness_shared::{db::Database, http::HttpClient, mail::messages::MailContext, mail::Mailer};

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field is cheap to
/// clone.
#[derive(Clone)]
pub struct AppState {
    /// Database handle
    pub db: Database,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outbound email
    pub mailer: Arc<dyn Mailer>,

    /// Outbound HTTP (webhook delivery)
    pub http: Arc<dyn HttpClient>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: Config,
        mailer: Arc<dyn Mailer>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
            http,
        }
    }

    /// Secret signing sessions and reset links
    pub fn secret(&self) -> &str {
        &self.config.session.secret_key
    }

    /// Site details for building emails
    pub fn mail_context(&self) -> MailContext {
        MailContext {
            app_name: self.config.site.app_name.clone(),
            site_url: self.config.site.site_url.clone(),
            from_email: self.config.site.default_from_email.clone(),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET       /                    # Home page
/// ├── GET       /health              # Health check (JSON)
/// ├── GET, POST /sign-up
/// ├── GET, POST /login
/// ├── POST      /logout
/// ├── GET, POST /password-reset
/// ├── GET, POST /reset/:uid/:token   # Set password from an emailed link
/// ├── GET, POST /account             # Session required
/// ├── GET, POST /password-change     # Session required
/// ├── POST      /token-reset         # Session or API token (JSON)
/// └── /webhooks                      # Session or API token (JSON)
///     ├── GET, POST /
///     └── GET, DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Security headers
/// 2. CORS
/// 3. Request tracing
/// 4. Error page rendering
/// 5. Panic recovery
/// 6. CSRF origin check
/// 7. Authentication (resolves the caller; guards are per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Public pages and the health check
    let public_routes = Router::new()
        .route("/", get(routes::pages::index))
        .route("/health", get(routes::health::health_check))
        .route(
            "/sign-up",
            get(routes::accounts::sign_up_form).post(routes::accounts::sign_up),
        )
        .route(
            "/login",
            get(routes::accounts::login_form).post(routes::accounts::login),
        )
        .route("/logout", post(routes::accounts::logout))
        .route(
            "/password-reset",
            get(routes::password::reset_form).post(routes::password::reset),
        )
        .route(
            "/reset/:uid/:token",
            get(routes::password::reset_confirm_form).post(routes::password::reset_confirm),
        );

    // Pages that need a browser session
    let session_routes = Router::new()
        .route(
            "/account",
            get(routes::accounts::account).post(routes::accounts::update_account),
        )
        .route(
            "/password-change",
            get(routes::password::change_form).post(routes::password::change),
        )
        .route_layer(from_fn(require_login));

    // JSON API (session or API token)
    let api_routes = Router::new()
        .route("/token-reset", post(routes::tokens::token_reset))
        .route(
            "/webhooks",
            get(routes::webhooks::list_subscriptions).post(routes::webhooks::create_subscription),
        )
        .route(
            "/webhooks/:id",
            get(routes::webhooks::get_subscription).delete(routes::webhooks::delete_subscription),
        )
        .route_layer(from_fn(require_api_auth));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(api_routes)
        .fallback(routes::pages::not_found)
        .layer(from_fn_with_state(state.clone(), authenticate))
        .layer(from_fn_with_state(state.clone(), csrf_protect))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn_with_state(state.clone(), render_error_pages))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}
