/// Command-line interface
///
/// ```text
/// witness run [ADDRPORT]                       # serve HTTP
/// witness migrate                              # apply migrations
/// witness create-superuser --email E --password P
/// witness send-test-webhook <SUBSCRIPTION_ID>  # deliver a sample event
/// ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;
use witness_shared::{
    db::{
        migrations::run_migrations,
        pool::{create_pool, PoolConfig},
        Database,
    },
    http::ReqwestHttpClient,
    mail::LogMailer,
    models::{
        user::{NewUser, User},
        webhook::{EventType, WebhookSubscription},
    },
    webhooks,
};

use crate::{
    app::{build_router, AppState},
    config::{self, Config},
};

#[derive(Debug, Parser)]
#[command(name = "witness", version, about = "Witness account server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the web server
    Run {
        /// `PORT` or `HOST:PORT`; defaults to API_HOST/API_PORT
        addrport: Option<String>,
    },

    /// Apply pending database migrations
    Migrate,

    /// Create a confirmed staff superuser
    CreateSuperuser {
        #[arg(long)]
        email: String,

        #[arg(long, env = "WITNESS_SUPERUSER_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// POST a sample ARCHIVE_CREATED event to one subscription
    SendTestWebhook {
        subscription_id: Uuid,
    },
}

/// Resolves the `run` address argument against the configured defaults
///
/// A bare port keeps the default host.
pub fn resolve_addrport(addrport: Option<&str>, config: &Config) -> anyhow::Result<String> {
    let Some(addrport) = addrport else {
        return Ok(config.bind_address());
    };

    if let Ok(port) = addrport.parse::<u16>() {
        return Ok(format!("{}:{}", config.api.host, port));
    }

    match addrport.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(addrport.to_string())
        }
        _ => anyhow::bail!("\"{}\" is not a valid port number or address:port pair", addrport),
    }
}

async fn connect(config: &Config) -> anyhow::Result<Database> {
    let pool = create_pool(PoolConfig {
        max_connections: config.database.max_connections,
        ..PoolConfig::new(&config.database.url)
    })
    .await
    .context("Failed to connect to the database")?;

    Ok(Database::new(pool))
}

pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    match cli.command {
        Command::Run { addrport } => serve(config, addrport.as_deref()).await,
        Command::Migrate => {
            let db = connect(&config).await?;
            run_migrations(db.pool()).await?;
            Ok(())
        }
        Command::CreateSuperuser {
            email,
            password,
            first_name,
            last_name,
        } => {
            let db = connect(&config).await?;
            let user = User::create_superuser(
                &db,
                NewUser::new(email).name(first_name, last_name).password(password),
            )
            .await?;
            tracing::info!(user_id = %user.id, email = %user.email, "Superuser created");
            Ok(())
        }
        Command::SendTestWebhook { subscription_id } => {
            let db = connect(&config).await?;
            let subscription = WebhookSubscription::find_by_id(&db, subscription_id)
                .await?
                .with_context(|| format!("No webhook subscription with id {}", subscription_id))?;

            let http = ReqwestHttpClient::new()?;
            let data = serde_json::json!({
                "guid": "TEST-0000",
                "url": "https://example.com/",
                "creation_timestamp": chrono::Utc::now().to_rfc3339(),
            });

            let outcome = webhooks::deliver(&http, &subscription, &data).await;
            if !outcome.succeeded() {
                anyhow::bail!(
                    "Delivery of {} to {} failed (status: {:?}, error: {:?})",
                    EventType::ArchiveCreated,
                    subscription.callback_url,
                    outcome.status,
                    outcome.error
                );
            }
            tracing::info!(status = ?outcome.status, "Test webhook delivered");
            Ok(())
        }
    }
}

async fn serve(config: Config, addrport: Option<&str>) -> anyhow::Result<()> {
    let address = resolve_addrport(addrport, &config)?;
    let db = connect(&config).await?;

    let state = AppState::new(
        db,
        config,
        Arc::new(LogMailer),
        Arc::new(ReqwestHttpClient::new()?),
    );
    let app = build_router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(
        "Witness server listening on http://{} (dockerized: {})",
        address,
        config::is_dockerized()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::for_tests("postgresql://localhost/test")
    }

    #[test]
    fn test_resolve_addrport() {
        let config = config();

        assert_eq!(resolve_addrport(None, &config).unwrap(), "127.0.0.1:8000");
        assert_eq!(resolve_addrport(Some("9000"), &config).unwrap(), "127.0.0.1:9000");
        assert_eq!(resolve_addrport(Some("0.0.0.0:8000"), &config).unwrap(), "0.0.0.0:8000");
        assert!(resolve_addrport(Some("nope"), &config).is_err());
        assert!(resolve_addrport(Some(":8000"), &config).is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["witness", "run", "0.0.0.0:8000"]).unwrap();
        assert!(matches!(cli.command, Command::Run { addrport: Some(ref a) } if a == "0.0.0.0:8000"));

        let cli = Cli::try_parse_from([
            "witness",
            "create-superuser",
            "--email",
            "admin@example.com",
            "--password",
            "s3cret-pass",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::CreateSuperuser { ref email, .. } if email == "admin@example.com"));

        assert!(Cli::try_parse_from(["witness", "send-test-webhook", "not-a-uuid"]).is_err());
    }
}
