//! Type definitions for AML Sentry
//! All core data structures for address risk aggregation

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::address::Address;
use crate::utils::constants::get_network_profile;

/// Identifier of a configured risk data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Native coin balance
    Balance,
    /// Contract vs. externally owned account
    ContractType,
    /// Recent transaction activity
    TransactionCount,
    /// Keyword scan for block/seizure indicators
    HeuristicRisk,
}

impl SourceId {
    /// Every source the engine ships with, in report order
    pub const ALL: [SourceId; 4] = [
        SourceId::Balance,
        SourceId::ContractType,
        SourceId::TransactionCount,
        SourceId::HeuristicRisk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Balance => "balance",
            SourceId::ContractType => "contract_type",
            SourceId::TransactionCount => "transaction_count",
            SourceId::HeuristicRisk => "heuristic_risk",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a single source fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    /// Fetch and parse succeeded
    Ok,
    /// Timeout, transport error, provider error or bad payload
    Failed,
}

impl SignalStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            SignalStatus::Ok => "✅",
            SignalStatus::Failed => "⚠️",
        }
    }
}

/// The payload of a successful source fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalValue {
    /// Native coin balance in display units
    Balance { native: f64 },
    /// Whether deployed code answers for this address
    ContractType { is_contract: bool },
    /// Records on the most recent activity page (page-bounded, not lifetime)
    TransactionCount { count: u64 },
    /// Best-effort keyword match against raw provider text
    HeuristicRisk {
        flagged: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl SignalValue {
    /// One-line human description, e.g. for CLI output
    pub fn describe(&self, native_symbol: &str) -> String {
        match self {
            SignalValue::Balance { native } => {
                format!("{:.6} {}", native, native_symbol)
            }
            SignalValue::ContractType { is_contract } => {
                if *is_contract {
                    "contract (deployed code)".to_string()
                } else {
                    "externally owned account".to_string()
                }
            }
            SignalValue::TransactionCount { count } => {
                format!("{} recent transactions", count)
            }
            SignalValue::HeuristicRisk { flagged, reason } => match (flagged, reason) {
                (true, Some(r)) => format!("🚨 flagged: {}", r),
                (true, None) => "🚨 flagged".to_string(),
                (false, _) => "no risk indicators".to_string(),
            },
        }
    }
}

/// One source's contribution to a report.
///
/// A failed fetch still produces a signal; the error detail rides along
/// instead of a value, so reports stay structurally complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSignal {
    pub source: SourceId,
    pub status: SignalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<SignalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// Fetch latency in milliseconds
    pub latency_ms: u64,
}

impl RiskSignal {
    pub fn ok(source: SourceId, value: SignalValue, latency_ms: u64) -> Self {
        Self {
            source,
            status: SignalStatus::Ok,
            value: Some(value),
            error_detail: None,
            latency_ms,
        }
    }

    pub fn failed(source: SourceId, detail: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            source,
            status: SignalStatus::Failed,
            value: None,
            error_detail: Some(detail.into()),
            latency_ms,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SignalStatus::Ok
    }
}

/// A persisted blocklist record.
///
/// The address itself is the map key in the store, not a field here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlocklistEntry {
    /// Free-text justification supplied by the operator
    pub reason: String,
    /// Provenance label ("manual" when the operator supplied none)
    pub source: String,
    /// Operator who committed the entry
    pub added_by: String,
    pub added_at: DateTime<Utc>,
}

/// Aggregated risk report for one address.
///
/// Contains exactly one signal per configured source regardless of how
/// many fetches failed. Built per request, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub address: Address,
    pub network: String,
    pub signals: HashMap<SourceId, RiskSignal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocklist_entry: Option<BlocklistEntry>,
    pub generated_at: DateTime<Utc>,
    /// End-to-end aggregation latency in milliseconds
    pub latency_ms: u64,
}

impl Report {
    pub fn new(address: Address, network: impl Into<String>) -> Self {
        Self {
            address,
            network: network.into(),
            signals: HashMap::new(),
            blocklist_entry: None,
            generated_at: Utc::now(),
            latency_ms: 0,
        }
    }

    pub fn signal(&self, source: SourceId) -> Option<&RiskSignal> {
        self.signals.get(&source)
    }

    /// Sources whose fetch failed, in stable order
    pub fn failed_sources(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|id| self.signals.get(id).map(|s| !s.is_ok()).unwrap_or(false))
            .collect()
    }

    /// Blocklisted, or the heuristic source raised a flag
    pub fn is_flagged(&self) -> bool {
        if self.blocklist_entry.is_some() {
            return true;
        }
        matches!(
            self.signal(SourceId::HeuristicRisk).and_then(|s| s.value.as_ref()),
            Some(SignalValue::HeuristicRisk { flagged: true, .. })
        )
    }

    /// Set the aggregation latency
    pub fn set_latency(&mut self, start: Instant) {
        self.latency_ms = start.elapsed().as_millis() as u64;
    }

    /// Pretty print the report
    pub fn summary(&self) -> String {
        let symbol = get_network_profile(&self.network)
            .map(|p| p.native_symbol)
            .unwrap_or("native");

        let mut output = format!("\n🛡️ Report for {} ({})\n", self.address, self.network);

        match &self.blocklist_entry {
            Some(entry) => {
                output.push_str(&format!(
                    "   🚫 BLOCKLISTED: {} (source: {}, by: {})\n",
                    entry.reason, entry.source, entry.added_by
                ));
            }
            None => output.push_str("   ✅ Not on the blocklist\n"),
        }

        for id in SourceId::ALL {
            if let Some(signal) = self.signal(id) {
                match (&signal.value, &signal.error_detail) {
                    (Some(value), _) => {
                        output.push_str(&format!(
                            "   {} {}: {}\n",
                            signal.status.emoji(),
                            id,
                            value.describe(symbol)
                        ));
                    }
                    (None, Some(detail)) => {
                        output.push_str(&format!(
                            "   {} {}: unavailable ({})\n",
                            signal.status.emoji(),
                            id,
                            detail
                        ));
                    }
                    (None, None) => {
                        output.push_str(&format!("   {} {}: unavailable\n", signal.status.emoji(), id));
                    }
                }
            }
        }

        output.push_str(&format!("   Latency: {}ms\n", self.latency_ms));
        output
    }
}
