//! Rosebank back-office server
//!
//! REST API for bank staff and clients: client onboarding, loan issuance,
//! scheduled and early repayment, audit log and database backups.

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{AllowHeaders, CorsLayer};

use rosebank_server::config::Config;
use rosebank_server::db::{create_pool, run_migrations, Database};
use rosebank_server::notification::{EmailTransport, LogTransport, Notifier, SmtpMailer};
use rosebank_server::{build_router, build_state};

const EMAIL_DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        database = %config.database_url_masked(),
        "Starting Rosebank back office"
    );

    // Initialize database connection pool
    let pool = create_pool(&config).await?;
    run_migrations(&pool).await?;
    let db = Database::new(pool.clone()).with_tx_timeout(config.tx_timeout());

    // Email delivery
    let transport: Arc<dyn EmailTransport> = match config.smtp.host.as_deref() {
        Some(host) => Arc::new(SmtpMailer::new(&config.smtp, host)?),
        None => {
            tracing::warn!("SMTP_HOST not set, outgoing email will only be logged");
            Arc::new(LogTransport)
        }
    };
    let (notifier, email_worker) = Notifier::start(transport);

    let app_state = build_state(db, &config, notifier);

    if let Some((login, password)) = &config.bootstrap_admin {
        let created = app_state
            .auth_service
            .bootstrap_admin(login, password)
            .await
            .context("Failed to bootstrap administrator")?;
        if !created {
            tracing::debug!("Administrator already present, bootstrap skipped");
        }
    }

    // Daily backups
    let mut scheduler = app_state.backup_service.clone().start_scheduler().await?;

    let app = build_router(app_state).layer(configure_cors(&config));

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("Invalid BIND_ADDRESS or PORT")?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Backup scheduler did not stop cleanly");
    }

    // The router held the last notifier handles; the worker drains and exits
    match tokio::time::timeout(EMAIL_DRAIN_TIMEOUT, email_worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Email worker stopped abnormally"),
        Err(_) => tracing::warn!("Pending email not delivered before shutdown"),
    }

    pool.close().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins = config.cors_allowed_origins.as_deref().unwrap_or_default();

    if allowed_origins.is_empty() {
        if config.environment.is_production() {
            tracing::warn!("CORS_ALLOWED_ORIGINS not set in production, cross-origin requests are refused");
            return CorsLayer::new();
        }
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    // Credentials (the token cookie) rule out wildcard headers
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
