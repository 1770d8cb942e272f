/// Configuration management for the Witness server
///
/// Configuration is read from environment variables; a `.env` file is loaded first in
/// development.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `SECRET_KEY`: signs sessions and reset links, at least 32 characters (required)
/// - `API_HOST` / `API_PORT`: bind address (default: `0.0.0.0:8000` when `DOCKERIZED` is
///   set, else `127.0.0.1:8000`)
/// - `APP_NAME`: shown in pages and emails (default: Witness)
/// - `SITE_URL`: absolute base for emailed links (default: http://localhost:8000)
/// - `DEFAULT_FROM_EMAIL`: sender for account emails
/// - `PRODUCTION`: enables HSTS and secure cookies
/// - `SESSION_COOKIE_NAME` (default: sessionid), `SESSION_COOKIE_AGE` (seconds, two weeks)
/// - `PASSWORD_RESET_TIMEOUT`: reset link lifetime in seconds (default: three days)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any
/// - `ACCESSIBILITY_POLICY_URL`: linked from every page footer
/// - `RUST_LOG`: log filter
///
/// # Example
///
/// ```no_run
/// use witness_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Port used when `API_PORT` is not set
pub const DEFAULT_PORT: u16 = 8000;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub site: SiteConfig,
    pub session: SessionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Enables HSTS and the `Secure` cookie attribute
    pub production: bool,

    /// Allowed CORS origins (`*` = any)
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Details used to render pages and build emailed links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub app_name: String,

    /// Scheme and host of the public site, no trailing slash
    pub site_url: String,

    pub default_from_email: String,
    pub accessibility_policy_url: String,
}

/// Session and reset-link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Signs session cookies and reset links
    ///
    /// IMPORTANT: keep secret; at least 32 bytes. Generate with `openssl rand -hex 32`.
    pub secret_key: String,

    pub cookie_name: String,

    /// Session lifetime in seconds
    pub cookie_age_seconds: i64,

    /// Reset/confirmation link lifetime in seconds
    pub password_reset_timeout_seconds: i64,
}

/// Whether the process runs inside the project's container image
pub fn is_dockerized() -> bool {
    env_flag("DOCKERIZED")
}

/// Default bind host for `witness run`
pub fn default_host() -> &'static str {
    if is_dockerized() {
        "0.0.0.0"
    } else {
        "127.0.0.1"
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn env_or<T: FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value: {}", name, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `SECRET_KEY` is missing
    /// - `SECRET_KEY` is shorter than 32 characters
    /// - a numeric variable does not parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| default_host().to_string());
        let port = env_or("API_PORT", DEFAULT_PORT)?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let secret_key = env::var("SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("SECRET_KEY environment variable is required"))?;
        if secret_key.len() < 32 {
            anyhow::bail!("SECRET_KEY must be at least 32 characters long");
        }

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                production: env_flag("PRODUCTION"),
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            site: SiteConfig {
                app_name: env::var("APP_NAME").unwrap_or_else(|_| "Witness".to_string()),
                site_url: env::var("SITE_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{}", DEFAULT_PORT))
                    .trim_end_matches('/')
                    .to_string(),
                default_from_email: env::var("DEFAULT_FROM_EMAIL")
                    .unwrap_or_else(|_| "noreply@witness.local".to_string()),
                accessibility_policy_url: env::var("ACCESSIBILITY_POLICY_URL")
                    .unwrap_or_else(|_| "https://accessibility.huit.harvard.edu/digital-accessibility-policy".to_string()),
            },
            session: SessionConfig {
                secret_key,
                cookie_name: env::var("SESSION_COOKIE_NAME")
                    .unwrap_or_else(|_| "sessionid".to_string()),
                cookie_age_seconds: env_or(
                    "SESSION_COOKIE_AGE",
                    witness_shared::auth::session::DEFAULT_SESSION_AGE_SECONDS,
                )?,
                password_reset_timeout_seconds: env_or(
                    "PASSWORD_RESET_TIMEOUT",
                    witness_shared::auth::reset_token::DEFAULT_TIMEOUT_SECONDS,
                )?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Host (and port) part of the site URL, compared against request origins
    pub fn site_host(&self) -> Option<String> {
        let url = url::Url::parse(&self.site.site_url).ok()?;
        let host = url.host_str()?;
        Some(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// Configuration for tests: local database URL, fixed secret
    pub fn for_tests(database_url: &str) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: DEFAULT_PORT,
                production: false,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: database_url.to_string(),
                max_connections: 5,
            },
            site: SiteConfig {
                app_name: "Witness".to_string(),
                site_url: "http://testserver".to_string(),
                default_from_email: "noreply@witness.local".to_string(),
                accessibility_policy_url: "https://example.com/accessibility".to_string(),
            },
            session: SessionConfig {
                secret_key: "test-secret-key-at-least-32-bytes-long".to_string(),
                cookie_name: "sessionid".to_string(),
                cookie_age_seconds: witness_shared::auth::session::DEFAULT_SESSION_AGE_SECONDS,
                password_reset_timeout_seconds:
                    witness_shared::auth::reset_token::DEFAULT_TIMEOUT_SECONDS,
            },
        }
    }
}
