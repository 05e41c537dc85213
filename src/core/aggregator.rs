//! Aggregation Engine
//!
//! Fans out one fetch per configured source plus the local blocklist
//! lookup, each under its own timeout, and merges whatever comes back into
//! a single report. Partial failure is the normal case: a slow or broken
//! source costs its own signal, never the report.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::models::address::Address;
use crate::models::config::EngineConfig;
use crate::models::types::{Report, RiskSignal};
use crate::providers::sources::RiskDataSource;
use crate::storage::BlocklistStore;
use crate::utils::telemetry::EngineTelemetry;

/// The engine behind every address check
pub struct Aggregator {
    sources: Vec<Arc<dyn RiskDataSource>>,
    store: Arc<BlocklistStore>,
    telemetry: Arc<EngineTelemetry>,
    config: EngineConfig,
}

impl Aggregator {
    pub fn new(
        sources: Vec<Arc<dyn RiskDataSource>>,
        store: Arc<BlocklistStore>,
        telemetry: Arc<EngineTelemetry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sources,
            store,
            telemetry,
            config,
        }
    }

    /// Analyze one validated address.
    ///
    /// Has no failure outcome: the result always contains exactly one
    /// signal per configured source. The blocklist lookup runs alongside
    /// the fetches under its own timeout; if it times out the report
    /// simply carries no entry.
    pub async fn analyze(&self, address: &Address) -> Report {
        let start = Instant::now();

        let mut handles = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let source = Arc::clone(source);
            let address = address.clone();
            let timeout = self.config.source_timeout;
            handles.push(tokio::spawn(async move {
                source.fetch_signal(&address, timeout).await
            }));
        }

        let store = Arc::clone(&self.store);
        let lookup_address = address.clone();
        let lookup_timeout = self.config.lookup_timeout;
        let lookup_handle = tokio::spawn(async move {
            match tokio::time::timeout(lookup_timeout, store.lookup(&lookup_address)).await {
                Ok(entry) => entry,
                Err(_) => {
                    warn!("⏱️ Blocklist lookup timed out for {}", lookup_address.short());
                    None
                }
            }
        });

        let mut report = Report::new(address.clone(), self.config.network.name);

        for (idx, joined) in join_all(handles).await.into_iter().enumerate() {
            let signal = match joined {
                Ok(signal) => signal,
                // a panicked fetch task degrades like any other failure
                Err(e) => RiskSignal::failed(
                    self.sources[idx].id(),
                    format!("fetch task failed: {}", e),
                    start.elapsed().as_millis() as u64,
                ),
            };
            report.signals.insert(signal.source, signal);
        }

        report.blocklist_entry = match lookup_handle.await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("⚠️ Blocklist lookup task failed: {}", e);
                None
            }
        };

        report.set_latency(start);
        self.telemetry.record_check(&report);

        let failed = report.failed_sources();
        if failed.is_empty() {
            info!(
                "🔍 {} checked in {}ms ({} signals)",
                address.short(),
                report.latency_ms,
                report.signals.len()
            );
        } else {
            info!(
                "🔍 {} checked in {}ms ({}/{} signals failed: {:?})",
                address.short(),
                report.latency_ms,
                failed.len(),
                report.signals.len(),
                failed
            );
        }

        report
    }

    /// Sources currently configured, in report order
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::address::validate_address;
    use crate::models::types::{SignalStatus, SignalValue, SourceId};
    use crate::utils::constants::PROFILE_ETHEREUM;
    use async_trait::async_trait;
    use eyre::eyre;
    use std::path::PathBuf;
    use std::time::Duration;
    use uuid::Uuid;

    struct StubSource {
        id: SourceId,
        outcome: StubOutcome,
    }

    enum StubOutcome {
        Value(SignalValue),
        Error(String),
        Hang,
    }

    #[async_trait]
    impl RiskDataSource for StubSource {
        fn id(&self) -> SourceId {
            self.id
        }

        async fn fetch(&self, _address: &Address) -> eyre::Result<SignalValue> {
            match &self.outcome {
                StubOutcome::Value(value) => Ok(value.clone()),
                StubOutcome::Error(msg) => Err(eyre!("{}", msg)),
                StubOutcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(eyre!("unreachable"))
                }
            }
        }
    }

    fn stub(id: SourceId, outcome: StubOutcome) -> Arc<dyn RiskDataSource> {
        Arc::new(StubSource { id, outcome })
    }

    fn test_address() -> Address {
        validate_address("0x1f9090aae28b8a3dceadf281b0f12828e676c326", &PROFILE_ETHEREUM)
            .unwrap()
    }

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("aml-sentry-agg-{}.json", Uuid::new_v4()))
    }

    async fn build_aggregator(
        sources: Vec<Arc<dyn RiskDataSource>>,
        source_timeout: Duration,
    ) -> (Aggregator, Arc<BlocklistStore>, PathBuf) {
        let path = temp_path();
        let store = Arc::new(BlocklistStore::load(path.clone()).await.unwrap());
        let mut config = EngineConfig::default();
        config.source_timeout = source_timeout;
        config.lookup_timeout = Duration::from_secs(2);

        let aggregator = Aggregator::new(
            sources,
            store.clone(),
            Arc::new(EngineTelemetry::new()),
            config,
        );
        (aggregator, store, path)
    }

    fn all_failing_sources() -> Vec<Arc<dyn RiskDataSource>> {
        vec![
            stub(
                SourceId::Balance,
                StubOutcome::Error("connection refused".to_string()),
            ),
            stub(
                SourceId::ContractType,
                StubOutcome::Error("bad gateway".to_string()),
            ),
            stub(SourceId::TransactionCount, StubOutcome::Hang),
            stub(SourceId::HeuristicRisk, StubOutcome::Hang),
        ]
    }

    #[tokio::test]
    async fn test_all_sources_contribute_signals() {
        let sources = vec![
            stub(
                SourceId::Balance,
                StubOutcome::Value(SignalValue::Balance { native: 2.5 }),
            ),
            stub(
                SourceId::ContractType,
                StubOutcome::Value(SignalValue::ContractType { is_contract: false }),
            ),
            stub(
                SourceId::TransactionCount,
                StubOutcome::Value(SignalValue::TransactionCount { count: 12 }),
            ),
        ];
        let (aggregator, _store, path) =
            build_aggregator(sources, Duration::from_secs(5)).await;

        let report = aggregator.analyze(&test_address()).await;

        assert_eq!(report.signals.len(), 3);
        assert!(report.signals.values().all(|s| s.is_ok()));
        assert!(report.blocklist_entry.is_none());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_failures_degrade_without_erasing_others() {
        let sources = vec![
            stub(
                SourceId::Balance,
                StubOutcome::Error("connection refused".to_string()),
            ),
            stub(
                SourceId::TransactionCount,
                StubOutcome::Value(SignalValue::TransactionCount { count: 3 }),
            ),
        ];
        let (aggregator, _store, path) =
            build_aggregator(sources, Duration::from_secs(5)).await;

        let report = aggregator.analyze(&test_address()).await;

        assert_eq!(report.signals.len(), 2);

        let balance = report.signal(SourceId::Balance).unwrap();
        assert_eq!(balance.status, SignalStatus::Failed);
        assert!(balance
            .error_detail
            .as_deref()
            .unwrap()
            .contains("connection refused"));

        let txs = report.signal(SourceId::TransactionCount).unwrap();
        assert!(txs.is_ok());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_hanging_source_times_out_individually() {
        let sources = vec![
            stub(SourceId::Balance, StubOutcome::Hang),
            stub(
                SourceId::ContractType,
                StubOutcome::Value(SignalValue::ContractType { is_contract: true }),
            ),
        ];
        let (aggregator, _store, path) =
            build_aggregator(sources, Duration::from_millis(50)).await;

        let report = aggregator.analyze(&test_address()).await;

        assert_eq!(report.failed_sources(), vec![SourceId::Balance]);
        assert!(report.signal(SourceId::ContractType).unwrap().is_ok());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_blocklist_entry_rides_along() {
        let sources = vec![stub(
            SourceId::Balance,
            StubOutcome::Value(SignalValue::Balance { native: 0.0 }),
        )];
        let (aggregator, store, path) =
            build_aggregator(sources, Duration::from_secs(5)).await;

        store
            .add(&test_address(), "drainer payout wallet", "osint", "ops")
            .await
            .unwrap();

        let report = aggregator.analyze(&test_address()).await;

        let entry = report.blocklist_entry.as_ref().unwrap();
        assert_eq!(entry.reason, "drainer payout wallet");
        assert!(report.is_flagged());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_every_source_failing_still_fills_every_signal() {
        let (aggregator, _store, path) =
            build_aggregator(all_failing_sources(), Duration::from_millis(300)).await;

        let report = aggregator.analyze(&test_address()).await;

        assert_eq!(report.signals.len(), 4);
        for id in SourceId::ALL {
            let signal = report.signal(id).expect("every source leaves a signal");
            assert_eq!(signal.status, SignalStatus::Failed);
            assert!(signal.error_detail.is_some());
        }
        assert_eq!(report.failed_sources().len(), 4);
        assert!(!report.is_flagged());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_blocklist_entry_survives_total_source_failure() {
        let (aggregator, store, path) =
            build_aggregator(all_failing_sources(), Duration::from_millis(300)).await;

        store
            .add(&test_address(), "sanctions match", "ofac", "ops")
            .await
            .unwrap();

        let report = aggregator.analyze(&test_address()).await;

        assert_eq!(report.failed_sources().len(), 4);
        let entry = report
            .blocklist_entry
            .as_ref()
            .expect("the local lookup does not depend on the sources");
        assert_eq!(entry.reason, "sanctions match");
        assert!(report.is_flagged());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_no_sources_still_yields_report() {
        let (aggregator, _store, path) =
            build_aggregator(Vec::new(), Duration::from_secs(5)).await;

        let report = aggregator.analyze(&test_address()).await;

        assert!(report.signals.is_empty());
        assert!(!report.is_flagged());

        let _ = std::fs::remove_file(path);
    }
}
