//! Authentication and role management server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use tracing::info;
use vdm::{db::Database, mail::LogMailer};
use vdm_server::{api, config::ServerConfig, logging, metrics};

const HELP: &str = "\
Run the vdm authentication server

USAGE:
  vdm_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/vdm]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  ACCESS_TOKEN_SECRET      Access token signing secret (required, >= 32 chars)
  REFRESH_TOKEN_SECRET     Refresh token hashing key (required, >= 32 chars)
  PASSWORD_TOKEN_SECRET    Reset token hashing key (required, >= 32 chars)
  CLIENT_URL               Front-end origin for reset links and CORS
  RBAC_MIN_TAG_LENGTH      Minimum user tag length for role mutations [default: 6]
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics exported on {addr}");
    }

    info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to apply migrations")?;
    info!("Database connected and migrated");

    let state = api::AppState::new(
        Arc::new(db.auth_repository()),
        Arc::new(LogMailer),
        &config.security,
        config.rbac,
        &config.client_url,
    )?;
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!("Server is running at http://{}. Press Ctrl+C to stop.", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {e}");
        std::future::pending::<()>().await;
    }
}
