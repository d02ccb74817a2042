//! StayHub Booking Service
//!
//! Main entry point for the booking/availability/payment reconciliation
//! backend. This service provides:
//! - HTTP API for payment orders, verification and cancellation
//! - Provider webhook reconciliation
//! - Append-only audit trail of booking commits and skipped reconciliations

use stayhub_backend::config::AppConfig;
use stayhub_backend::database::{create_pool, run_migrations};
use stayhub_backend::error::{AppError, AppResult};
use stayhub_backend::services::{AuditTrailService, RazorpayClient};
use stayhub_backend::{http, AppState, Stores};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "stayhub_backend={},sqlx=warn,tower_http=info",
            config.log_level
        )
        .into()
    });

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    init_tracing(&config);

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           StayHub Booking Service Starting               ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);
    info!("Payment provider: {:?}", config.payment);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    let audit = Arc::new(
        AuditTrailService::new(std::path::PathBuf::from(&config.audit_log_dir)).map_err(|e| {
            error!("Failed to initialize audit trail: {}", e);
            e
        })?,
    );
    info!("✓ Audit trail service initialized");

    let gateway = Arc::new(RazorpayClient::new(&config.payment)?);
    info!("✓ Payment provider client initialized ({})", config.payment.api_base);

    let state = AppState::new(
        Stores::postgres(pool),
        gateway,
        audit,
        &config.payment,
        &config.booking,
        config.internal_auth_secret.clone(),
    );
    info!(
        "✓ Booking services initialized (cancellation window {}h)",
        config.booking.cancellation_window_hours
    );
    if state.internal_auth_secret.is_none() {
        info!("INTERNAL_AUTH_SECRET not set - trusting x-user-id from any caller");
    }

    // =========================================================================
    // START SERVER
    // =========================================================================
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Message(format!("Failed to bind HTTP server: {}", e)))?;

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║           StayHub Booking Service Ready!                 ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  HTTP API:     {}                              ║", addr);
    info!("║  Environment:  {}                                    ║", config.environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Message(format!("HTTP server error: {}", e)))?;

    info!("StayHub booking service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, shutting down gracefully...");
}
