//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::core::session::{SessionHandle, SessionReply};
use crate::models::address::Address;
use crate::models::errors::AppError;
use crate::models::types::{BlocklistEntry, Report, SourceId};
use crate::utils::constants::DEFAULT_BATCH_CONCURRENCY;
use crate::utils::telemetry::TelemetryStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "API_BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "API_RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "API_INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            details: err.source.as_ref().map(|s| s.to_string()),
            message: err.message,
        }
    }
}

// ============================================
// Address Check
// ============================================

#[derive(Debug, Deserialize)]
pub struct CheckAddressRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct CheckAddressData {
    /// True when the address is blocklisted or heuristically flagged
    pub flagged: bool,
    pub report: Report,
}

impl From<Report> for CheckAddressData {
    fn from(report: Report) -> Self {
        Self {
            flagged: report.is_flagged(),
            report,
        }
    }
}

// ============================================
// Batch Check
// ============================================

#[derive(Debug, Deserialize)]
pub struct BatchCheckRequest {
    pub addresses: Vec<String>,
    /// Max concurrent checks (default: 8, max: 32)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    DEFAULT_BATCH_CONCURRENCY
}

#[derive(Debug, Serialize)]
pub struct BatchCheckData {
    pub total_requested: usize,
    pub total_processed: usize,
    pub total_flagged: usize,
    pub total_blocklisted: usize,
    pub results: Vec<BatchItemResult>,
    pub processing_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct BatchItemResult {
    pub address: String,
    pub status: String, // "success" | "error"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocklisted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_sources: Option<Vec<SourceId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: f64,
}

// ============================================
// Blocklist Lookup
// ============================================

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct LookupData {
    pub address: Address,
    pub listed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<BlocklistEntry>,
}

// ============================================
// Edit Sessions
// ============================================

#[derive(Debug, Deserialize)]
pub struct SessionBeginRequest {
    /// Who is asking; recorded as `added_by` on committed entries
    pub operator: String,
}

#[derive(Debug, Serialize)]
pub struct SessionBeginData {
    pub handle: SessionHandle,
    pub reply: SessionReply,
}

#[derive(Debug, Deserialize)]
pub struct SessionInputRequest {
    pub handle: String,
    pub input: String,
}

// ============================================
// Stats / Telemetry
// ============================================

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub engine: TelemetryStats,
    pub blocklist_entries: usize,
    pub active_sessions: usize,
    pub uptime_seconds: u64,
    pub api_version: String,
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub network: String,
    pub uptime_seconds: u64,
}
