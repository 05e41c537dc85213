//! Explorer API Client Module
//!
//! Shared HTTP client for Etherscan-style query APIs (module/action GET
//! endpoints with an optional API key):
//! 1. Exponential backoff retry logic with jitter, HTTP 429 aware
//! 2. User-Agent header & API key protection (key never logged)
//! 3. Gzip compression for large result pages
//!
//! Responses use the provider envelope {status, message, result}. The
//! "status" field is a provider-side outcome flag; each risk source
//! interprets it for its own endpoint. This client only guarantees
//! transport-level success.

use eyre::{eyre, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::config::EngineConfig;
use crate::utils::constants::{DEFAULT_HTTP_TIMEOUT_SECS, USER_AGENT as USER_AGENT_CONST};

// ============================================
// RETRY CONSTANTS
// ============================================

/// Base retry delay in milliseconds
pub const EXPLORER_BASE_RETRY_MS: u64 = 500;

/// Maximum retry delay in milliseconds
pub const EXPLORER_MAX_RETRY_MS: u64 = 4000;

/// Maximum attempts per query (kept small so retries fit inside the
/// per-source fetch timeout)
pub const EXPLORER_MAX_RETRIES: u32 = 3;

/// Jitter percentage for retry delay (prevents thundering herd)
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// Provider envelope shared by all Etherscan-style endpoints.
///
/// "1" in `status` means the provider answered the question; "0" covers
/// both real failures (rate limits, bad keys) and answer-shaped negatives
/// ("No transactions found"). Disambiguation belongs to the source that
/// owns the endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerEnvelope {
    pub status: String,
    pub message: String,
    pub result: serde_json::Value,
}

impl ExplorerEnvelope {
    /// Provider-side success flag
    pub fn is_provider_ok(&self) -> bool {
        self.status == "1"
    }

    /// Best text to describe a status-0 answer: the result string when the
    /// provider put its explanation there, the message otherwise
    pub fn failure_detail(&self) -> String {
        self.result
            .as_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|| self.message.clone())
    }
}

/// Explorer client with retry logic
#[derive(Clone)]
pub struct ExplorerClient {
    /// Query endpoint, e.g. https://api.etherscan.io/api
    base_url: String,
    /// Optional API key, appended as the apikey query parameter
    api_key: Option<String>,
    /// HTTP client with custom headers (gzip enabled)
    client: reqwest::Client,
    /// Network name for logging
    network_name: String,
}

impl ExplorerClient {
    /// Create a client from the engine configuration
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::from_parts(
            config.explorer_url.clone(),
            config.explorer_api_key.clone(),
            config.network.name.to_string(),
        )
    }

    /// Create a client from raw parts (tests, self-hosted mirrors)
    pub fn from_parts(
        base_url: String,
        api_key: Option<String>,
        network_name: String,
    ) -> Result<Self> {
        let client = Self::build_client()?;

        Ok(Self {
            base_url,
            api_key,
            client,
            network_name,
        })
    }

    /// Build HTTP client with custom headers
    fn build_client() -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
    }

    /// Query endpoint (for logging; never contains the key)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    /// Execute a query with retry, parsing the provider envelope.
    ///
    /// `params` are the module/action query pairs; the API key is appended
    /// automatically when configured.
    pub async fn query(&self, params: &[(&str, &str)]) -> Result<ExplorerEnvelope> {
        let mut last_error = None;

        for attempt in 0..EXPLORER_MAX_RETRIES {
            if attempt > 0 {
                self.backoff(attempt).await;
            }

            match self.execute_query(params).await {
                Ok(envelope) => return Ok(envelope),
                Err(e) => {
                    if e.to_string().contains("429") {
                        warn!(
                            "⏳ {} rate limited (HTTP 429), backing off (attempt {}/{})",
                            self.network_name,
                            attempt + 1,
                            EXPLORER_MAX_RETRIES
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| eyre!("Unknown error after {} retries", EXPLORER_MAX_RETRIES)))
    }

    /// Execute a query with retry, returning the raw response body.
    ///
    /// Used by the heuristic source, which scans provider text instead of
    /// parsing the envelope.
    pub async fn query_raw(&self, params: &[(&str, &str)]) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..EXPLORER_MAX_RETRIES {
            if attempt > 0 {
                self.backoff(attempt).await;
            }

            match self.execute_raw(params).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| eyre!("Unknown error after {} retries", EXPLORER_MAX_RETRIES)))
    }

    /// Exponential backoff with ±20% jitter
    async fn backoff(&self, attempt: u32) {
        let base_delay = EXPLORER_BASE_RETRY_MS * (2_u64.pow(attempt - 1));
        let capped_delay = base_delay.min(EXPLORER_MAX_RETRY_MS);

        let jitter_range = (capped_delay * RETRY_JITTER_PERCENT) / 100;
        let jitter: i64 =
            rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
        let final_delay = (capped_delay as i64 + jitter).max(50) as u64;

        debug!(
            "⏳ Retry {}/{} after {}ms (base: {}ms, jitter: {}ms)",
            attempt + 1,
            EXPLORER_MAX_RETRIES,
            final_delay,
            capped_delay,
            jitter
        );
        tokio::time::sleep(Duration::from_millis(final_delay)).await;
    }

    /// Execute a single query and parse the envelope
    async fn execute_query(&self, params: &[(&str, &str)]) -> Result<ExplorerEnvelope> {
        let response = self.send(params).await?;

        response
            .json::<ExplorerEnvelope>()
            .await
            .map_err(|e| eyre!("Failed to parse response: {}", e))
    }

    /// Execute a single query and return the body text
    async fn execute_raw(&self, params: &[(&str, &str)]) -> Result<String> {
        let response = self.send(params).await?;

        response
            .text()
            .await
            .map_err(|e| eyre!("Failed to read response body: {}", e))
    }

    async fn send(&self, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        let mut request = self.client.get(&self.base_url).query(params);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| eyre!("Request failed: {}", e))?;

        let status = response.status();
        if status == 429 {
            return Err(eyre!("Rate limited (HTTP 429)"));
        }
        if !status.is_success() {
            return Err(eyre!("HTTP error: {}", status));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_with_string_result() {
        let json = r#"{"status":"1","message":"OK","result":"40891626854930000000000"}"#;
        let envelope: ExplorerEnvelope = serde_json::from_str(json).unwrap();

        assert!(envelope.is_provider_ok());
        assert_eq!(envelope.result.as_str(), Some("40891626854930000000000"));
    }

    #[test]
    fn test_envelope_with_array_result() {
        let json = r#"{"status":"1","message":"OK","result":[{"hash":"0xabc"},{"hash":"0xdef"}]}"#;
        let envelope: ExplorerEnvelope = serde_json::from_str(json).unwrap();

        assert!(envelope.is_provider_ok());
        assert_eq!(envelope.result.as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_failure_detail_prefers_result_string() {
        let json = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        let envelope: ExplorerEnvelope = serde_json::from_str(json).unwrap();

        assert!(!envelope.is_provider_ok());
        assert_eq!(envelope.failure_detail(), "Max rate limit reached");
    }

    #[test]
    fn test_failure_detail_falls_back_to_message() {
        let json = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        let envelope: ExplorerEnvelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.failure_detail(), "No transactions found");
    }

    #[test]
    fn test_client_from_parts() {
        let client = ExplorerClient::from_parts(
            "https://api.etherscan.io/api".to_string(),
            None,
            "ethereum".to_string(),
        )
        .unwrap();

        assert_eq!(client.base_url(), "https://api.etherscan.io/api");
        assert_eq!(client.network_name(), "ethereum");
    }
}
