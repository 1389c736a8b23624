pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod otp;
pub mod sms;
pub mod twitter;

#[cfg(test)]
pub mod testutil;

use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::db::Database;
use crate::otp::OtpThrottler;
use crate::sms::{SmsSender, TwilioSender};
use crate::twitter::{
    client::{ReqwestTransport, TwitterClient},
    signer::OauthSigner,
    TwitterAuth,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub otp: Arc<OtpThrottler>,
    /// None when consumer credentials are not configured
    pub twitter: Option<Arc<TwitterAuth>>,
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;

    tracing::info!(
        "Database pool: max={} connections",
        config.database.max_connections
    );

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations completed successfully");

    let db = Database::new(pool);
    let config = Arc::new(config);

    // OTP issuance: Twilio delivery when configured, logged otherwise
    let sms: Arc<dyn SmsSender> = Arc::new(TwilioSender::new(config.twilio.clone()));
    if !config.twilio.enabled {
        tracing::warn!("SMS delivery disabled - verification codes will be logged");
    }

    let otp = Arc::new(OtpThrottler::new(
        Arc::new(db.clone()),
        sms,
        Arc::new(db.clone()),
        Arc::new(SystemClock),
        config.otp.clone(),
    ));
    tracing::info!(
        "OTP policy: {} attempts per {}s window, {}-digit codes",
        config.otp.max_attempts,
        config.otp.window_secs,
        config.otp.code_length
    );

    // Twitter connection: requires consumer credentials
    let twitter = if config.twitter.is_configured() {
        let signer = OauthSigner::new(
            config.twitter.consumer_key.clone(),
            config.twitter.consumer_secret.clone(),
        );
        let client = TwitterClient::new(
            signer,
            Arc::new(ReqwestTransport::new()),
            config.twitter.api_base.clone(),
        );
        tracing::info!("Twitter integration enabled ({})", config.twitter.api_base);
        Some(Arc::new(TwitterAuth::new(client, Arc::new(db.clone()))))
    } else {
        tracing::warn!("Twitter integration disabled - consumer credentials not set");
        None
    };

    let state = AppState {
        db,
        config: config.clone(),
        otp,
        twitter,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_check))
        .route(
            "/ready",
            get({
                let db = state.db.clone();
                move || ready_check(db.clone())
            }),
        )
        .nest("/api/v1", api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("speakup listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Readiness check - verifies database connectivity
async fn ready_check(db: Database) -> Result<&'static str, &'static str> {
    match sqlx::query("SELECT 1").execute(db.pool()).await {
        Ok(_) => Ok("ready"),
        Err(_) => Err("database unavailable"),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
