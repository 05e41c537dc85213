//! API Request Handlers

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::info;

use super::types::*;
use crate::core::aggregator::Aggregator;
use crate::core::session::{
    start_expiry_sweep, EditSessionManager, SessionHandle, SessionPolicy, SessionReply,
};
use crate::models::address::validate_address;
use crate::models::config::EngineConfig;
use crate::models::errors::{AppError, AppResult};
use crate::providers::explorer::ExplorerClient;
use crate::providers::sources::default_sources;
use crate::storage::BlocklistStore;
use crate::utils::telemetry::EngineTelemetry;

/// Shared application state
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub store: Arc<BlocklistStore>,
    pub sessions: Arc<EditSessionManager>,
    pub telemetry: Arc<EngineTelemetry>,
    pub config: EngineConfig,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the whole engine together: explorer client, sources, store,
    /// session manager and aggregator, plus the session expiry sweep.
    pub async fn new(config: EngineConfig) -> AppResult<Self> {
        let telemetry = Arc::new(EngineTelemetry::new());

        let client = ExplorerClient::new(&config)?;
        let sources = default_sources(&client);

        let store = Arc::new(BlocklistStore::load(config.blocklist_path.clone()).await?);

        let sessions = Arc::new(EditSessionManager::new(
            SessionPolicy::from_config(&config),
            store.clone(),
            telemetry.clone(),
            config.session_ttl,
        ));
        start_expiry_sweep(sessions.clone());

        let aggregator = Arc::new(Aggregator::new(
            sources,
            store.clone(),
            telemetry.clone(),
            config.clone(),
        ));

        Ok(Self {
            aggregator,
            store,
            sessions,
            telemetry,
            config,
            start_time: Instant::now(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Map an engine error onto the HTTP surface
fn reject(err: AppError, start: Instant) -> (StatusCode, Json<ApiResponse<()>>) {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiResponse::error(err.into(), elapsed_ms(start))))
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        network: state.config.network.name.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Address Check
// ============================================

pub async fn check_address(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckAddressRequest>,
) -> Result<Json<ApiResponse<CheckAddressData>>, (StatusCode, Json<ApiResponse<()>>)> {
    let start = Instant::now();

    let address =
        validate_address(&req.address, state.config.network).map_err(|e| reject(e, start))?;

    let report = state.aggregator.analyze(&address).await;

    Ok(Json(ApiResponse::success(report.into(), elapsed_ms(start))))
}

// ============================================
// Batch Check
// ============================================

pub async fn batch_check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchCheckRequest>,
) -> Result<Json<ApiResponse<BatchCheckData>>, (StatusCode, Json<ApiResponse<()>>)> {
    let start = Instant::now();

    if req.addresses.is_empty() {
        return Err(reject(
            AppError::bad_request("addresses array cannot be empty"),
            start,
        ));
    }

    if req.addresses.len() > 100 {
        return Err(reject(
            AppError::bad_request("Maximum 100 addresses per batch request"),
            start,
        ));
    }

    let concurrency = req.concurrency.clamp(1, 32);

    // Process addresses concurrently, bounded by the semaphore
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::new();

    for raw in req.addresses.iter() {
        let sem = semaphore.clone();
        let raw = raw.clone();
        let aggregator = state.aggregator.clone();
        let network = state.config.network;

        let handle = tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let item_start = Instant::now();

            match validate_address(&raw, network) {
                Ok(address) => {
                    let report = aggregator.analyze(&address).await;
                    let failed = report.failed_sources();

                    BatchItemResult {
                        address: report.address.to_string(),
                        status: "success".to_string(),
                        flagged: Some(report.is_flagged()),
                        blocklisted: Some(report.blocklist_entry.is_some()),
                        failed_sources: if failed.is_empty() { None } else { Some(failed) },
                        error: None,
                        latency_ms: item_start.elapsed().as_secs_f64() * 1000.0,
                    }
                }
                Err(e) => BatchItemResult {
                    address: raw,
                    status: "error".to_string(),
                    flagged: None,
                    blocklisted: None,
                    failed_sources: None,
                    error: Some(e.message),
                    latency_ms: item_start.elapsed().as_secs_f64() * 1000.0,
                },
            }
        });

        handles.push(handle);
    }

    // Collect results
    let mut results = Vec::new();
    for handle in handles {
        if let Ok(result) = handle.await {
            results.push(result);
        }
    }

    let total_flagged = results.iter().filter(|r| r.flagged.unwrap_or(false)).count();
    let total_blocklisted = results
        .iter()
        .filter(|r| r.blocklisted.unwrap_or(false))
        .count();

    info!(
        "📦 Batch check: {}/{} flagged, {} blocklisted",
        total_flagged,
        results.len(),
        total_blocklisted
    );

    let data = BatchCheckData {
        total_requested: req.addresses.len(),
        total_processed: results.len(),
        total_flagged,
        total_blocklisted,
        results,
        processing_time_ms: elapsed_ms(start),
    };

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

// ============================================
// Blocklist Lookup
// ============================================

pub async fn lookup_blocklist(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<ApiResponse<LookupData>>, (StatusCode, Json<ApiResponse<()>>)> {
    let start = Instant::now();

    let address =
        validate_address(&req.address, state.config.network).map_err(|e| reject(e, start))?;

    let entry = state.store.lookup(&address).await;

    let data = LookupData {
        listed: entry.is_some(),
        address,
        entry,
    };

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

// ============================================
// Edit Sessions
// ============================================

pub async fn session_begin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionBeginRequest>,
) -> Result<Json<ApiResponse<SessionBeginData>>, (StatusCode, Json<ApiResponse<()>>)> {
    let start = Instant::now();

    if !state.config.editing_enabled() {
        return Err(reject(
            AppError::bad_request("Blocklist editing is not enabled on this deployment"),
            start,
        ));
    }

    let operator = req.operator.trim();
    if operator.is_empty() {
        return Err(reject(AppError::bad_request("operator must not be empty"), start));
    }

    let (handle, reply) = state.sessions.begin(operator);

    Ok(Json(ApiResponse::success(
        SessionBeginData { handle, reply },
        elapsed_ms(start),
    )))
}

pub async fn session_input(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionInputRequest>,
) -> Result<Json<ApiResponse<SessionReply>>, (StatusCode, Json<ApiResponse<()>>)> {
    let start = Instant::now();

    let handle = SessionHandle::parse(&req.handle).map_err(|e| reject(e, start))?;

    let reply = state
        .sessions
        .submit(&handle, &req.input)
        .await
        .map_err(|e| reject(e, start))?;

    Ok(Json(ApiResponse::success(reply, elapsed_ms(start))))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let stats = state.telemetry.get_stats();

    let data = StatsData {
        engine: stats,
        blocklist_entries: state.store.len().await,
        active_sessions: state.sessions.active_sessions(),
        uptime_seconds: state.uptime_seconds(),
        api_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}
