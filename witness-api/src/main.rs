//! # Witness server
//!
//! Account management (sign-up, email confirmation, password reset, API tokens) and
//! webhook subscriptions behind an Axum server.
//!
//! ## Usage
//!
//! ```bash
//! witness migrate
//! witness run 0.0.0.0:8000
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use witness_api::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "witness_api=debug,witness_shared=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!(
        "Witness v{} ({})",
        env!("CARGO_PKG_VERSION"),
        witness_shared::VERSION
    );

    cli::execute(cli).await
}
