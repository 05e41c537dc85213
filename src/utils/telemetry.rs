//! Telemetry Module for AML Sentry
//!
//! Collects anonymous operating statistics:
//! - check volume, latency and per-source failure counts
//! - blocklist activity (hits, adds, removes)
//! - edit session outcomes
//!
//! Privacy-first: no addresses stored, only counters.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::models::types::{Report, SourceId};

/// Aggregated statistics for reporting
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelemetryStats {
    /// Total address checks served
    pub total_checks: u64,
    /// Checks that hit the blocklist
    pub blocklist_hits: u64,
    /// Checks where the heuristic source raised a flag
    pub heuristic_flags: u64,
    /// Failed fetches by source
    pub failures_by_source: HashMap<String, u64>,
    /// Average check latency (ms)
    pub avg_latency_ms: f64,
    /// Edit sessions opened
    pub sessions_started: u64,
    /// Edit sessions rejected at the secret gate
    pub sessions_denied: u64,
    /// Blocklist entries committed
    pub entries_added: u64,
    /// Blocklist entries removed
    pub entries_removed: u64,
    /// Period start timestamp
    pub period_start: u64,
    /// Period end timestamp
    pub period_end: u64,
}

impl TelemetryStats {
    /// Export as JSON for API
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Main telemetry collector
pub struct EngineTelemetry {
    total_checks: AtomicU64,
    blocklist_hits: AtomicU64,
    heuristic_flags: AtomicU64,
    total_latency_ms: AtomicU64,
    sessions_started: AtomicU64,
    sessions_denied: AtomicU64,
    entries_added: AtomicU64,
    entries_removed: AtomicU64,
    /// Failure counters by source
    failure_counts: RwLock<HashMap<SourceId, u64>>,
    /// Session start time
    session_start: u64,
    /// Export directory
    export_dir: PathBuf,
}

impl EngineTelemetry {
    /// Create new collector with default settings
    pub fn new() -> Self {
        Self::with_export_dir(PathBuf::from("./telemetry"))
    }

    /// Create collector with custom export directory
    pub fn with_export_dir(export_dir: PathBuf) -> Self {
        Self {
            total_checks: AtomicU64::new(0),
            blocklist_hits: AtomicU64::new(0),
            heuristic_flags: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            sessions_denied: AtomicU64::new(0),
            entries_added: AtomicU64::new(0),
            entries_removed: AtomicU64::new(0),
            failure_counts: RwLock::new(HashMap::new()),
            session_start: current_timestamp(),
            export_dir,
        }
    }

    /// Record a completed address check
    pub fn record_check(&self, report: &Report) {
        self.total_checks.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(report.latency_ms, Ordering::Relaxed);

        if report.blocklist_entry.is_some() {
            self.blocklist_hits.fetch_add(1, Ordering::Relaxed);
        } else if report.is_flagged() {
            self.heuristic_flags.fetch_add(1, Ordering::Relaxed);
        }

        let failed = report.failed_sources();
        if !failed.is_empty() {
            if let Ok(mut counts) = self.failure_counts.write() {
                for source in failed {
                    *counts.entry(source).or_insert(0) += 1;
                }
            }
        }
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_denied(&self) {
        self.sessions_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_entry_added(&self) {
        self.entries_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_entry_removed(&self) {
        self.entries_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        let total_checks = self.total_checks.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency = if total_checks > 0 {
            total_latency as f64 / total_checks as f64
        } else {
            0.0
        };

        let failures_by_source = self
            .failure_counts
            .read()
            .map(|counts| {
                counts
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), *v))
                    .collect()
            })
            .unwrap_or_default();

        TelemetryStats {
            total_checks,
            blocklist_hits: self.blocklist_hits.load(Ordering::Relaxed),
            heuristic_flags: self.heuristic_flags.load(Ordering::Relaxed),
            failures_by_source,
            avg_latency_ms: avg_latency,
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_denied: self.sessions_denied.load(Ordering::Relaxed),
            entries_added: self.entries_added.load(Ordering::Relaxed),
            entries_removed: self.entries_removed.load(Ordering::Relaxed),
            period_start: self.session_start,
            period_end: current_timestamp(),
        }
    }

    /// Export current stats to JSON file
    pub fn export_stats_json(&self) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.export_dir)?;

        let stats = self.get_stats();
        let filename = format!("stats_{}.json", current_timestamp());
        let path = self.export_dir.join(filename);

        let json = serde_json::to_string_pretty(&stats)?;
        fs::write(&path, json)?;

        Ok(path)
    }

    /// Reset counters (for new reporting period)
    #[allow(dead_code)]
    pub fn reset(&self) {
        self.total_checks.store(0, Ordering::Relaxed);
        self.blocklist_hits.store(0, Ordering::Relaxed);
        self.heuristic_flags.store(0, Ordering::Relaxed);
        self.total_latency_ms.store(0, Ordering::Relaxed);
        self.sessions_started.store(0, Ordering::Relaxed);
        self.sessions_denied.store(0, Ordering::Relaxed);
        self.entries_added.store(0, Ordering::Relaxed);
        self.entries_removed.store(0, Ordering::Relaxed);

        if let Ok(mut counts) = self.failure_counts.write() {
            counts.clear();
        }
    }
}

impl Default for EngineTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

// Helper functions

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::address::validate_address;
    use crate::models::types::{RiskSignal, SignalValue};
    use crate::utils::constants::PROFILE_ETHEREUM;

    fn report_with_failure() -> Report {
        let address =
            validate_address("0x1f9090aae28b8a3dceadf281b0f12828e676c326", &PROFILE_ETHEREUM)
                .unwrap();
        let mut report = Report::new(address, "ethereum");
        report.latency_ms = 120;
        report.signals.insert(
            SourceId::Balance,
            RiskSignal::ok(SourceId::Balance, SignalValue::Balance { native: 1.0 }, 50),
        );
        report.signals.insert(
            SourceId::HeuristicRisk,
            RiskSignal::failed(SourceId::HeuristicRisk, "timed out", 15000),
        );
        report
    }

    #[test]
    fn test_record_check() {
        let telemetry = EngineTelemetry::new();
        telemetry.record_check(&report_with_failure());
        telemetry.record_check(&report_with_failure());

        let stats = telemetry.get_stats();
        assert_eq!(stats.total_checks, 2);
        assert_eq!(stats.avg_latency_ms, 120.0);
        assert_eq!(stats.failures_by_source.get("heuristic_risk"), Some(&2));
        assert_eq!(stats.blocklist_hits, 0);
    }

    #[test]
    fn test_session_counters() {
        let telemetry = EngineTelemetry::new();
        telemetry.record_session_started();
        telemetry.record_session_denied();
        telemetry.record_entry_added();
        telemetry.record_entry_removed();

        let stats = telemetry.get_stats();
        assert_eq!(stats.sessions_started, 1);
        assert_eq!(stats.sessions_denied, 1);
        assert_eq!(stats.entries_added, 1);
        assert_eq!(stats.entries_removed, 1);
    }

    #[test]
    fn test_stats_json_export() {
        let stats = TelemetryStats {
            total_checks: 1000,
            blocklist_hits: 50,
            avg_latency_ms: 23.5,
            ..Default::default()
        };

        let json = stats.to_json();
        assert!(json.contains("1000"));
        assert!(json.contains("blocklist_hits"));
    }
}
