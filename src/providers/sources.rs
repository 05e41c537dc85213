//! Risk Data Sources
//!
//! One implementation per external signal, all behind the [`RiskDataSource`]
//! trait. Implementations do exactly one read-only provider round trip and
//! parse the payload; the provided [`fetch_signal`](RiskDataSource::fetch_signal)
//! wrapper is the aggregation boundary where every failure mode (timeout,
//! transport, provider error, bad payload) degrades into a failed signal.
//!
//! Payload parsing is split into pure functions so provider semantics are
//! testable against canned JSON without a network.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::U256;
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::debug;

use crate::models::address::Address;
use crate::models::types::{RiskSignal, SignalValue, SourceId};
use crate::providers::explorer::{ExplorerClient, ExplorerEnvelope};
use crate::utils::constants::{
    ABI_NOT_VERIFIED_SENTINEL, HEURISTIC_PAGE_SIZE, NATIVE_UNIT_SCALE, NO_TRANSACTIONS_SENTINEL,
    RISK_KEYWORDS, TX_COUNT_PAGE_SIZE,
};

/// A single external risk signal provider.
///
/// Implementations must be idempotent and side-effect free: the engine may
/// call them concurrently and callers may re-invoke an entire analysis to
/// retry failed sources.
#[async_trait]
pub trait RiskDataSource: Send + Sync {
    /// Identifier under which this source's signal appears in reports
    fn id(&self) -> SourceId;

    /// One provider round trip for one address.
    ///
    /// Errors returned here never reach the aggregator's callers; they are
    /// captured by [`fetch_signal`](RiskDataSource::fetch_signal).
    async fn fetch(&self, address: &Address) -> Result<SignalValue>;

    /// Fetch under a timeout, converting every failure into a failed
    /// signal. This is the only entry point the aggregator uses.
    async fn fetch_signal(&self, address: &Address, timeout: Duration) -> RiskSignal {
        let start = Instant::now();

        match tokio::time::timeout(timeout, self.fetch(address)).await {
            Ok(Ok(value)) => {
                let latency = start.elapsed().as_millis() as u64;
                debug!("✅ {} answered in {}ms", self.id(), latency);
                RiskSignal::ok(self.id(), value, latency)
            }
            Ok(Err(e)) => {
                let latency = start.elapsed().as_millis() as u64;
                debug!("⚠️ {} failed in {}ms: {}", self.id(), latency, e);
                RiskSignal::failed(self.id(), e.to_string(), latency)
            }
            Err(_) => {
                let latency = start.elapsed().as_millis() as u64;
                debug!("⏱️ {} timed out after {}ms", self.id(), latency);
                RiskSignal::failed(
                    self.id(),
                    format!("timed out after {}s", timeout.as_secs()),
                    latency,
                )
            }
        }
    }
}

/// All shipped sources wired to one explorer client, in report order
pub fn default_sources(client: &ExplorerClient) -> Vec<Arc<dyn RiskDataSource>> {
    vec![
        Arc::new(BalanceSource::new(client.clone())),
        Arc::new(ContractTypeSource::new(client.clone())),
        Arc::new(TransactionCountSource::new(client.clone())),
        Arc::new(HeuristicRiskSource::new(client.clone())),
    ]
}

// ============================================
// BALANCE SOURCE
// ============================================

/// Native coin balance via module=account&action=balance
pub struct BalanceSource {
    client: ExplorerClient,
}

impl BalanceSource {
    pub fn new(client: ExplorerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RiskDataSource for BalanceSource {
    fn id(&self) -> SourceId {
        SourceId::Balance
    }

    async fn fetch(&self, address: &Address) -> Result<SignalValue> {
        let envelope = self
            .client
            .query(&[
                ("module", "account"),
                ("action", "balance"),
                ("address", address.as_str()),
                ("tag", "latest"),
            ])
            .await?;

        parse_balance_payload(&envelope)
    }
}

/// Status "0" on the balance endpoint is always a provider failure (rate
/// limit, bad key), never a valid zero - a zero balance arrives as
/// status "1" with result "0".
pub fn parse_balance_payload(envelope: &ExplorerEnvelope) -> Result<SignalValue> {
    if !envelope.is_provider_ok() {
        return Err(eyre!("provider error: {}", envelope.failure_detail()));
    }

    let raw = envelope
        .result
        .as_str()
        .ok_or_else(|| eyre!("balance result is not a string"))?;

    let wei: U256 = raw
        .parse()
        .map_err(|_| eyre!("unparseable balance: {}", raw))?;

    Ok(SignalValue::Balance {
        native: wei_to_native(wei),
    })
}

/// Convert raw wei to display units.
/// Balances beyond u128 saturate; display precision is lost far earlier.
pub fn wei_to_native(wei: U256) -> f64 {
    let wei_u128: u128 = wei.try_into().unwrap_or(u128::MAX);
    wei_u128 as f64 / NATIVE_UNIT_SCALE
}

// ============================================
// CONTRACT TYPE SOURCE
// ============================================

/// Contract vs. EOA via module=contract&action=getabi
pub struct ContractTypeSource {
    client: ExplorerClient,
}

impl ContractTypeSource {
    pub fn new(client: ExplorerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RiskDataSource for ContractTypeSource {
    fn id(&self) -> SourceId {
        SourceId::ContractType
    }

    async fn fetch(&self, address: &Address) -> Result<SignalValue> {
        let envelope = self
            .client
            .query(&[
                ("module", "contract"),
                ("action", "getabi"),
                ("address", address.as_str()),
            ])
            .await?;

        parse_abi_payload(&envelope)
    }
}

/// Status "1" means a verified ABI exists, so deployed code answers for
/// the address. Status "0" forks: the "not verified" sentinel is a valid
/// negative answer (EOA or unverified code); anything else is a failure.
pub fn parse_abi_payload(envelope: &ExplorerEnvelope) -> Result<SignalValue> {
    if envelope.is_provider_ok() {
        return Ok(SignalValue::ContractType { is_contract: true });
    }

    let detail = envelope.failure_detail();
    if detail.to_lowercase().contains(ABI_NOT_VERIFIED_SENTINEL) {
        return Ok(SignalValue::ContractType { is_contract: false });
    }

    Err(eyre!("provider error: {}", detail))
}

// ============================================
// TRANSACTION COUNT SOURCE
// ============================================

/// Recent activity volume via module=account&action=txlist.
///
/// Reads one page of the most recent transactions, so the count is
/// page-bounded rather than a lifetime total. That is enough to separate
/// dormant addresses from active ones, which is all the signal claims.
pub struct TransactionCountSource {
    client: ExplorerClient,
}

impl TransactionCountSource {
    pub fn new(client: ExplorerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RiskDataSource for TransactionCountSource {
    fn id(&self) -> SourceId {
        SourceId::TransactionCount
    }

    async fn fetch(&self, address: &Address) -> Result<SignalValue> {
        let page_size = TX_COUNT_PAGE_SIZE.to_string();
        let envelope = self
            .client
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address.as_str()),
                ("page", "1"),
                ("offset", page_size.as_str()),
                ("sort", "desc"),
            ])
            .await?;

        parse_tx_page_payload(&envelope)
    }
}

/// An empty history comes back as status "0" with the "No transactions
/// found" sentinel - that is a valid zero, not a failure.
pub fn parse_tx_page_payload(envelope: &ExplorerEnvelope) -> Result<SignalValue> {
    if !envelope.is_provider_ok() {
        let detail = envelope.failure_detail();
        if detail.to_lowercase().contains(NO_TRANSACTIONS_SENTINEL)
            || envelope
                .message
                .to_lowercase()
                .contains(NO_TRANSACTIONS_SENTINEL)
        {
            return Ok(SignalValue::TransactionCount { count: 0 });
        }
        return Err(eyre!("provider error: {}", detail));
    }

    let records = envelope
        .result
        .as_array()
        .ok_or_else(|| eyre!("txlist result is not an array"))?;

    Ok(SignalValue::TransactionCount {
        count: records.len() as u64,
    })
}

// ============================================
// HEURISTIC RISK SOURCE
// ============================================

/// Best-effort keyword scan of raw provider text for block/seizure
/// indicators.
///
/// Known limitation: the vocabulary is small and substring matching misses
/// rephrased provider labels, so "not flagged" is absence of evidence, not
/// evidence of absence. A match is a prompt for manual review, never an
/// automated verdict.
pub struct HeuristicRiskSource {
    client: ExplorerClient,
}

impl HeuristicRiskSource {
    pub fn new(client: ExplorerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RiskDataSource for HeuristicRiskSource {
    fn id(&self) -> SourceId {
        SourceId::HeuristicRisk
    }

    async fn fetch(&self, address: &Address) -> Result<SignalValue> {
        let page_size = HEURISTIC_PAGE_SIZE.to_string();
        // Raw body scan: annotations ride along in fields the envelope
        // parser would discard (function names, counterparty labels)
        let body = self
            .client
            .query_raw(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address.as_str()),
                ("page", "1"),
                ("offset", page_size.as_str()),
                ("sort", "desc"),
            ])
            .await?;

        Ok(scan_risk_keywords(&body))
    }
}

/// Case-insensitive substring scan against the keyword vocabulary.
/// First match wins; the matched keyword becomes the flag reason.
pub fn scan_risk_keywords(body: &str) -> SignalValue {
    let haystack = body.to_lowercase();

    for keyword in RISK_KEYWORDS {
        if haystack.contains(keyword) {
            return SignalValue::HeuristicRisk {
                flagged: true,
                reason: Some(format!("matched keyword \"{}\"", keyword)),
            };
        }
    }

    SignalValue::HeuristicRisk {
        flagged: false,
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> ExplorerEnvelope {
        serde_json::from_str(json).unwrap()
    }

    // Balance payloads

    #[test]
    fn test_balance_parses_wei_to_native() {
        let env = envelope(r#"{"status":"1","message":"OK","result":"999000000000000000000"}"#);
        let value = parse_balance_payload(&env).unwrap();
        assert_eq!(value, SignalValue::Balance { native: 999.0 });
    }

    #[test]
    fn test_balance_zero_is_valid() {
        let env = envelope(r#"{"status":"1","message":"OK","result":"0"}"#);
        let value = parse_balance_payload(&env).unwrap();
        assert_eq!(value, SignalValue::Balance { native: 0.0 });
    }

    #[test]
    fn test_balance_status_zero_is_failure_even_on_http_200() {
        let env = envelope(r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#);
        let err = parse_balance_payload(&env).unwrap_err();
        assert!(err.to_string().contains("Max rate limit reached"));
    }

    #[test]
    fn test_balance_garbage_result_is_failure() {
        let env = envelope(r#"{"status":"1","message":"OK","result":"not-a-number"}"#);
        assert!(parse_balance_payload(&env).is_err());
    }

    #[test]
    fn test_wei_conversion() {
        assert_eq!(wei_to_native(U256::from(1_500_000_000_000_000_000u128)), 1.5);
        assert_eq!(wei_to_native(U256::ZERO), 0.0);
    }

    // ABI payloads

    #[test]
    fn test_abi_verified_means_contract() {
        let env = envelope(r#"{"status":"1","message":"OK","result":"[{\"inputs\":[]}]"}"#);
        let value = parse_abi_payload(&env).unwrap();
        assert_eq!(value, SignalValue::ContractType { is_contract: true });
    }

    #[test]
    fn test_abi_not_verified_means_not_contract() {
        let env = envelope(
            r#"{"status":"0","message":"NOTOK","result":"Contract source code not verified"}"#,
        );
        let value = parse_abi_payload(&env).unwrap();
        assert_eq!(value, SignalValue::ContractType { is_contract: false });
    }

    #[test]
    fn test_abi_other_status_zero_is_failure() {
        let env = envelope(r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#);
        assert!(parse_abi_payload(&env).is_err());
    }

    // Transaction page payloads

    #[test]
    fn test_tx_page_counts_records() {
        let env = envelope(
            r#"{"status":"1","message":"OK","result":[{"hash":"0xa"},{"hash":"0xb"},{"hash":"0xc"}]}"#,
        );
        let value = parse_tx_page_payload(&env).unwrap();
        assert_eq!(value, SignalValue::TransactionCount { count: 3 });
    }

    #[test]
    fn test_tx_page_empty_history_is_zero() {
        let env = envelope(r#"{"status":"0","message":"No transactions found","result":[]}"#);
        let value = parse_tx_page_payload(&env).unwrap();
        assert_eq!(value, SignalValue::TransactionCount { count: 0 });
    }

    #[test]
    fn test_tx_page_rate_limit_is_failure() {
        let env = envelope(r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#);
        assert!(parse_tx_page_payload(&env).is_err());
    }

    // Keyword scan

    #[test]
    fn test_scan_flags_seizure_vocabulary() {
        let body = r#"{"result":[{"functionName":"transfer","to":"0xabc","input":"Seized by authorities"}]}"#;
        match scan_risk_keywords(body) {
            SignalValue::HeuristicRisk { flagged, reason } => {
                assert!(flagged);
                assert_eq!(reason.as_deref(), Some("matched keyword \"seized\""));
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_scan_is_case_insensitive() {
        match scan_risk_keywords("TORNADO cash router") {
            SignalValue::HeuristicRisk { flagged, .. } => assert!(flagged),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_scan_clean_body_not_flagged() {
        let body = r#"{"result":[{"functionName":"transfer","to":"0xabc"}]}"#;
        match scan_risk_keywords(body) {
            SignalValue::HeuristicRisk { flagged, reason } => {
                assert!(!flagged);
                assert!(reason.is_none());
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    // Timeout boundary

    struct SlowSource;

    #[async_trait]
    impl RiskDataSource for SlowSource {
        fn id(&self) -> SourceId {
            SourceId::Balance
        }

        async fn fetch(&self, _address: &Address) -> Result<SignalValue> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(SignalValue::Balance { native: 1.0 })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RiskDataSource for FailingSource {
        fn id(&self) -> SourceId {
            SourceId::ContractType
        }

        async fn fetch(&self, _address: &Address) -> Result<SignalValue> {
            Err(eyre!("connection refused"))
        }
    }

    fn test_address() -> Address {
        crate::models::address::validate_address(
            "0x1f9090aae28b8a3dceadf281b0f12828e676c326",
            &crate::utils::constants::PROFILE_ETHEREUM,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_signal_times_out_into_failed_signal() {
        let signal = SlowSource
            .fetch_signal(&test_address(), Duration::from_millis(50))
            .await;

        assert!(!signal.is_ok());
        assert!(signal.error_detail.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_fetch_signal_captures_errors() {
        let signal = FailingSource
            .fetch_signal(&test_address(), Duration::from_secs(1))
            .await;

        assert!(!signal.is_ok());
        assert_eq!(signal.source, SourceId::ContractType);
        assert!(signal.error_detail.unwrap().contains("connection refused"));
    }
}
