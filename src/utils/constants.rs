//! Constants Module - Single Source of Truth
//!
//! Network profiles, provider sentinels, timing defaults and the heuristic
//! keyword vocabulary used across the engine. Other modules must not carry
//! hardcoded values for any of these.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "AML Sentry";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = "AmlSentry/0.1.0";

// ============================================
// TIMING DEFAULTS
// ============================================

/// Default per-source fetch timeout (seconds)
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 15;

/// Default blocklist lookup timeout (seconds)
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Default timeout for a single explorer HTTP request (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default idle lifetime of an edit session (seconds)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 900;

/// Default concurrency for batch address checks
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

// ============================================
// NETWORK PROFILES
// ============================================

/// Per-network address syntax and explorer endpoint.
///
/// The engine supports exactly the networks listed here; anything beyond
/// simple prefix+length+hex address syntax is out of scope.
#[derive(Debug)]
pub struct NetworkProfile {
    pub name: &'static str,
    /// Literal prefix every address must carry
    pub address_prefix: &'static str,
    /// Required total length including the prefix
    pub address_len: usize,
    /// Display symbol for the native unit
    pub native_symbol: &'static str,
    /// Etherscan-style query endpoint
    pub explorer_url: &'static str,
}

pub static PROFILE_ETHEREUM: NetworkProfile = NetworkProfile {
    name: "ethereum",
    address_prefix: "0x",
    address_len: 42,
    native_symbol: "ETH",
    explorer_url: "https://api.etherscan.io/api",
};

pub static PROFILE_BSC: NetworkProfile = NetworkProfile {
    name: "bsc",
    address_prefix: "0x",
    address_len: 42,
    native_symbol: "BNB",
    explorer_url: "https://api.bscscan.com/api",
};

/// Look up a network profile by name (case-insensitive)
pub fn get_network_profile(name: &str) -> Option<&'static NetworkProfile> {
    match name.to_lowercase().as_str() {
        "ethereum" | "eth" => Some(&PROFILE_ETHEREUM),
        "bsc" | "binance" => Some(&PROFILE_BSC),
        _ => None,
    }
}

/// Default network when none is configured
pub fn default_network() -> &'static NetworkProfile {
    &PROFILE_ETHEREUM
}

// ============================================
// PROVIDER SEMANTICS
// ============================================

/// Scale between the raw provider unit (wei) and the display unit
pub const NATIVE_UNIT_SCALE: f64 = 1e18;

/// Transaction-count sources read at most one page of this many records
pub const TX_COUNT_PAGE_SIZE: u32 = 100;

/// Page size for the heuristic scan of recent activity
pub const HEURISTIC_PAGE_SIZE: u32 = 25;

/// Provider text marking "no verified ABI" - an answer, not an outage
pub const ABI_NOT_VERIFIED_SENTINEL: &str = "not verified";

/// Provider text for an empty transaction history - a valid zero
pub const NO_TRANSACTIONS_SENTINEL: &str = "no transactions found";

// ============================================
// RISK HEURISTICS
// ============================================

/// Block/seizure vocabulary scanned for in raw provider text, lower-case.
///
/// Deliberately small; matching is substring-based and may miss rephrased
/// provider labels (false negatives are a documented property of the
/// heuristic source, not a defect to patch silently).
pub const RISK_KEYWORDS: [&str; 8] = [
    "blacklist",
    "blocked",
    "exploit",
    "phish",
    "sanction",
    "seized",
    "stolen",
    "tornado",
];

/// Label stored when an operator supplies no provenance for an entry
pub const DEFAULT_ENTRY_SOURCE: &str = "manual";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_lookup() {
        assert_eq!(get_network_profile("ethereum").unwrap().address_len, 42);
        assert_eq!(get_network_profile("ETH").unwrap().native_symbol, "ETH");
        assert_eq!(get_network_profile("bsc").unwrap().native_symbol, "BNB");
        assert!(get_network_profile("solana").is_none());
    }

    #[test]
    fn test_keywords_are_lowercase() {
        for kw in RISK_KEYWORDS {
            assert_eq!(kw, kw.to_lowercase());
        }
    }
}
