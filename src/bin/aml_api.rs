//! AML Sentry API Server
//!
//! REST API for address risk checks and blocklist management
//!
//! Usage:
//!   cargo run --bin aml_api
//!
//! Environment:
//!   SENTRY_PORT - Server port (default: 8080)
//!   SENTRY_HOST - Server host (default: 0.0.0.0)
//!   RUST_LOG    - Log level (default: info)
//!   plus the engine variables documented on `EngineConfig`

use aml_sentry::api::{create_router, handlers::AppState, start_cleanup_task};
use aml_sentry::EngineConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    print_banner();

    // Wire the engine
    let config = EngineConfig::default();
    if !config.editing_enabled() {
        warn!("⚠️ EDIT_SECRET not set - blocklist editing is disabled");
    }

    let state = Arc::new(AppState::new(config).await?);
    let telemetry_for_shutdown = state.telemetry.clone();

    // Start background cleanup task for rate limiter
    start_cleanup_task();
    info!("🧹 Background cleanup task started");

    // Create router
    let app = create_router(state);

    // Get server config from env
    // Railway uses PORT env var, fallback to SENTRY_PORT for local dev
    let host = std::env::var("SENTRY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("SENTRY_PORT"))
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("🚀 AML Sentry API starting on http://{}", addr);
    info!("📚 API Documentation: http://{}/v1/health", addr);
    info!("");
    info!("Endpoints:");
    info!("  POST /v1/check/address    - Full address risk report");
    info!("  POST /v1/check/batch      - Batch check (up to 100 addresses)");
    info!("  POST /v1/blocklist/lookup - Blocklist lookup only");
    info!("  POST /v1/session/begin    - Open a blocklist edit session");
    info!("  POST /v1/session/input    - Feed input into an edit session");
    info!("  GET  /v1/stats            - Engine statistics");
    info!("  GET  /v1/health           - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");
    info!("");

    // Start server with graceful shutdown
    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️ Failed to install Ctrl+C handler: {}", e);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    // Graceful shutdown sequence
    info!("");
    info!("🛑 Shutdown signal received, cleaning up...");

    // Export final telemetry
    info!("📊 Exporting final telemetry...");
    let stats = telemetry_for_shutdown.get_stats();
    info!("   Total checks: {}", stats.total_checks);
    info!("   Blocklist hits: {}", stats.blocklist_hits);
    info!("   Heuristic flags: {}", stats.heuristic_flags);

    match telemetry_for_shutdown.export_stats_json() {
        Ok(path) => info!("   ✅ Stats exported to: {}", path.display()),
        Err(e) => warn!("   ⚠️ Failed to export stats: {}", e),
    }

    info!("👋 AML Sentry API shutdown complete");

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════════╗
    ║                                                      ║
    ║        A M L   S E N T R Y                           ║
    ║                                                      ║
    ║        C L O U D   A P I   v0.1.0                    ║
    ║        Address Risk Aggregation Engine               ║
    ║                                                      ║
    ╚══════════════════════════════════════════════════════╝
    "#
    );
}
