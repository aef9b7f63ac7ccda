//! Signal Service
//!
//! Stateful WebSocket call-signaling server: presence registry, call-session
//! state machine and negotiation-message relay, plus an HTTP endpoint that
//! mints room-access grants for the media plane.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment (signing credentials are
//!    required - startup aborts without them)
//! 2. Spawn the coordinator actor (owns all signaling state)
//! 3. Build the router: `/ws` signaling, `/token` grants, health probes
//! 4. Bind the listener (fail fast on bind errors), mark ready
//! 5. Serve until Ctrl+C / SIGTERM, then drain and stop the actor

#![warn(clippy::pedantic)]

use std::sync::Arc;

use axum::Router;
use signal_service::actors::CoordinatorHandle;
use signal_service::config::Config;
use signal_service::observability::{health_router, HealthState};
use signal_service::server::signaling_router;
use signal_service::token::{token_router, TokenIssuer};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signal_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Signal Service");

    // Load configuration; missing signing credentials abort startup here.
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        instance_id = %config.instance_id,
        bind_address = %config.bind_address,
        reject_grace_seconds = config.reject_grace_seconds,
        disconnect_grace_seconds = config.disconnect_grace_seconds,
        token_ttl_seconds = config.token_ttl_seconds,
        "Configuration loaded successfully"
    );

    // Spawn the coordinator actor
    let coordinator = CoordinatorHandle::new(
        config.instance_id.clone(),
        config.reject_grace(),
        config.disconnect_grace(),
    );
    info!("Coordinator started");

    // Grant issuer for the /token endpoint
    let issuer = Arc::new(TokenIssuer::from_config(&config));

    let health_state = Arc::new(HealthState::new());

    // One listener serves signaling, token minting and health probes.
    // The surfaces are browser-facing, hence the permissive CORS layer.
    let app = Router::new()
        .merge(signaling_router(coordinator.clone()))
        .merge(token_router(issuer))
        .merge(health_router(Arc::clone(&health_state)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Bind BEFORE serving to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %config.bind_address, "Failed to bind listener");
            format!("Failed to bind listener to {}: {e}", config.bind_address)
        })?;
    info!(addr = %config.bind_address, "Listener bound successfully");

    health_state.set_ready();
    info!("Signal Service running - press Ctrl+C to shutdown");

    let shutdown_health = Arc::clone(&health_state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, initiating graceful shutdown...");
            // Stop advertising readiness so traffic drains before sockets close
            shutdown_health.set_not_ready();
        })
        .await?;

    // Stop the actor once the listener has drained
    coordinator.cancel();

    info!("Signal Service shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
