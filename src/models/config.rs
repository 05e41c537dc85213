//! Configuration module for AML Sentry
//!
//! Uses constants from utils/constants.rs - no hardcoded endpoints,
//! timeouts or network parameters in this file.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::utils::constants::{
    default_network, get_network_profile, NetworkProfile, DEFAULT_BATCH_CONCURRENCY,
    DEFAULT_LOOKUP_TIMEOUT_SECS, DEFAULT_SESSION_TTL_SECS, DEFAULT_SOURCE_TIMEOUT_SECS,
};

/// Engine configuration, read from environment variables.
///
/// | Variable              | Default                      |
/// |-----------------------|------------------------------|
/// | AML_NETWORK           | ethereum                     |
/// | EXPLORER_URL          | profile's explorer endpoint  |
/// | EXPLORER_API_KEY      | unset (public rate limits)   |
/// | SOURCE_TIMEOUT_SECS   | 15                           |
/// | LOOKUP_TIMEOUT_SECS   | 10                           |
/// | BLOCKLIST_PATH        | ./blocklist.json             |
/// | EDIT_SECRET           | unset (editing disabled)     |
/// | SESSION_TTL_SECS      | 900                          |
/// | BATCH_CONCURRENCY     | 8                            |
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Address syntax and explorer profile for the active network
    pub network: &'static NetworkProfile,
    /// Explorer query endpoint (overridable for tests/self-hosted mirrors)
    pub explorer_url: String,
    /// Optional explorer API key
    pub explorer_api_key: Option<String>,
    /// Per-source fetch timeout
    pub source_timeout: Duration,
    /// Blocklist lookup timeout
    pub lookup_timeout: Duration,
    /// Where the blocklist JSON lives
    pub blocklist_path: PathBuf,
    /// Shared secret gating blocklist edits (empty = editing disabled)
    pub edit_secret: String,
    /// Idle lifetime of an edit session
    pub session_ttl: Duration,
    /// Concurrent analyses in a batch check
    pub batch_concurrency: usize,
}

impl EngineConfig {
    /// Get explorer API key from environment.
    /// The key itself is never logged.
    fn get_explorer_key() -> Option<String> {
        if let Ok(key) = std::env::var("EXPLORER_API_KEY") {
            if !key.is_empty() && key != "YOUR_API_KEY" {
                info!("🔑 EXPLORER_API_KEY configured (key hidden for security)");
                return Some(key);
            }
        }
        None
    }

    /// Parse a numeric env var, falling back on missing or garbage values
    fn env_u64(var: &str, default: u64) -> u64 {
        match std::env::var(var) {
            Ok(raw) => match raw.parse() {
                Ok(value) => value,
                Err(_) => {
                    warn!("⚠️ {} is not a number ({}), using {}", var, raw, default);
                    default
                }
            },
            Err(_) => default,
        }
    }

    fn resolve_network() -> &'static NetworkProfile {
        let name = std::env::var("AML_NETWORK").unwrap_or_default();
        if name.is_empty() {
            return default_network();
        }
        match get_network_profile(&name) {
            Some(profile) => profile,
            None => {
                warn!("⚠️ Unknown network {:?}, falling back to ethereum", name);
                default_network()
            }
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let network = Self::resolve_network();

        Self {
            network,
            explorer_url: std::env::var("EXPLORER_URL")
                .unwrap_or_else(|_| network.explorer_url.to_string()),
            explorer_api_key: Self::get_explorer_key(),
            source_timeout: Duration::from_secs(Self::env_u64(
                "SOURCE_TIMEOUT_SECS",
                DEFAULT_SOURCE_TIMEOUT_SECS,
            )),
            lookup_timeout: Duration::from_secs(Self::env_u64(
                "LOOKUP_TIMEOUT_SECS",
                DEFAULT_LOOKUP_TIMEOUT_SECS,
            )),
            blocklist_path: PathBuf::from(
                std::env::var("BLOCKLIST_PATH").unwrap_or_else(|_| "./blocklist.json".to_string()),
            ),
            edit_secret: std::env::var("EDIT_SECRET").unwrap_or_default(),
            session_ttl: Duration::from_secs(Self::env_u64(
                "SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )),
            batch_concurrency: Self::env_u64(
                "BATCH_CONCURRENCY",
                DEFAULT_BATCH_CONCURRENCY as u64,
            ) as usize,
        }
    }
}

impl EngineConfig {
    /// Whether blocklist editing is possible at all
    pub fn editing_enabled(&self) -> bool {
        !self.edit_secret.is_empty()
    }
}
