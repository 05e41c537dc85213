//! AML Sentry Library
//!
//! Address risk aggregation engine for EVM-style networks:
//! - Syntactic address validation with canonical lowercase form
//! - Concurrent fan-out to independent risk data sources
//! - Partial-failure merge: one degraded source never sinks a report
//! - Persistent JSON blocklist with secret-gated edit sessions

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod storage;
pub mod utils;

pub use crate::core::aggregator::Aggregator;
pub use crate::core::session::{
    EditSessionManager, SessionHandle, SessionOutcome, SessionPolicy, SessionReply, SessionState,
};
pub use crate::models::address::{validate_address, Address};
pub use crate::models::config::EngineConfig;
pub use crate::models::errors::{AppError, AppResult, ErrorCode};
pub use crate::models::types::{
    BlocklistEntry, Report, RiskSignal, SignalStatus, SignalValue, SourceId,
};
pub use crate::providers::explorer::ExplorerClient;
pub use crate::providers::sources::{default_sources, RiskDataSource};
pub use crate::storage::{AddOutcome, BlocklistStore, RemoveOutcome};
pub use crate::utils::telemetry::{EngineTelemetry, TelemetryStats};
