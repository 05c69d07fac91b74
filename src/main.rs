//! bank_ledger - Bank Account Backend API
//!
//! Binary entry point: wires the Postgres stores, the exchange-rate
//! client and the engines into the HTTP router and serves it.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bank_ledger::api::{self, AppState};
use bank_ledger::auth::{AccessTokenSigner, Argon2PasswordVerifier, AuthenticationService, TokenService};
use bank_ledger::exchange::CurrencyApiClient;
use bank_ledger::ledger::LedgerEngine;
use bank_ledger::store::{PgAccountStore, PgUserStore, UserStore};
use bank_ledger::{db, Config};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bank_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting bank_ledger server");
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    // Wire stores and engines
    let accounts = Arc::new(PgAccountStore::new(pool.clone()));
    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let rates = Arc::new(CurrencyApiClient::new(
        config.exchange_api_url.clone(),
        config.exchange_api_key.clone(),
    ));

    let signer = AccessTokenSigner::new(
        config.auth_secret_bytes()?,
        config.auth_issuer.clone(),
        config.auth_audience.clone(),
    );

    let state = AppState {
        ledger: LedgerEngine::new(accounts, rates),
        auth: AuthenticationService::new(
            users.clone(),
            Arc::new(Argon2PasswordVerifier::new()),
            TokenService::new(users, signer.clone()),
        ),
        signer,
    };

    let app = axum::Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::create_router(state))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
