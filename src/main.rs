//! AML Sentry - one-shot address check from the command line
//!
//! Validates the address, fans out to every risk data source, consults
//! the blocklist and prints the merged report.
//!
//! Usage:
//!   aml_sentry <address>
//!
//! Environment: see `EngineConfig` for the full variable table.

use aml_sentry::{
    default_sources, validate_address, Aggregator, BlocklistStore, EngineConfig, EngineTelemetry,
    ExplorerClient,
};

use eyre::Result;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    print_banner();

    let raw = match std::env::args().nth(1) {
        Some(raw) if raw != "-h" && raw != "--help" => raw,
        _ => {
            eprintln!("Usage: aml_sentry <address>");
            eprintln!("       checks one address against all risk sources and the blocklist");
            std::process::exit(2);
        }
    };

    let config = EngineConfig::default();

    let address = match validate_address(&raw, config.network) {
        Ok(address) => address,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let telemetry = Arc::new(EngineTelemetry::new());
    let client = ExplorerClient::new(&config)?;
    let sources = default_sources(&client);
    let store = Arc::new(BlocklistStore::load(config.blocklist_path.clone()).await?);

    let aggregator = Aggregator::new(sources, store, telemetry, config);

    let report = aggregator.analyze(&address).await;
    println!("{}", report.summary());

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════════╗
    ║                                                      ║
    ║        A M L   S E N T R Y   v0.1.0                  ║
    ║        Address Risk Aggregation Engine               ║
    ║                                                      ║
    ╚══════════════════════════════════════════════════════╝
    "#
    );
}
