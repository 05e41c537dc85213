//! Blocklist Edit Sessions
//!
//! The secret-gated dialogue through which operators mutate the blocklist.
//! The machine itself is a pure transition function ([`step`]) so every
//! path is testable without I/O; [`EditSessionManager`] drives it, owns the
//! live sessions and executes commit effects against the store.
//!
//! Gate rules: one secret attempt per session, constant-time comparison,
//! cancel works from every state, invalid addresses re-prompt without
//! limit.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::address::{validate_address, Address};
use crate::models::config::EngineConfig;
use crate::models::errors::{AppError, AppResult};
use crate::storage::{normalize_source_label, AddOutcome, BlocklistStore, RemoveOutcome};
use crate::utils::constants::NetworkProfile;
use crate::utils::telemetry::EngineTelemetry;

/// Words that abort the dialogue from any state
const CANCEL_WORDS: [&str; 2] = ["cancel", "/cancel"];

// ============================================
// POLICY
// ============================================

/// What the machine needs to know about its environment: the gate secret
/// and the address syntax of the active network
#[derive(Clone)]
pub struct SessionPolicy {
    secret: String,
    pub network: &'static NetworkProfile,
}

impl SessionPolicy {
    pub fn new(secret: impl Into<String>, network: &'static NetworkProfile) -> Self {
        Self {
            secret: secret.into(),
            network,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.edit_secret.clone(), config.network)
    }

    /// Constant-time secret comparison. An unset secret never matches, so
    /// an unconfigured deployment cannot be edited with empty input.
    pub fn secret_matches(&self, input: &str) -> bool {
        if self.secret.is_empty() {
            return false;
        }
        constant_time_eq(self.secret.as_bytes(), input.as_bytes())
    }
}

/// XOR-fold equality over the longer of the two inputs; no early exit, a
/// length mismatch only feeds the accumulator.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= (x ^ y) as usize;
    }
    diff == 0
}

// ============================================
// MACHINE
// ============================================

/// Dialogue states. Address and reason accumulate inside the states that
/// collected them, so the machine carries all context itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Gate: next input is the secret, one attempt only
    AwaitingSecret,
    /// Authenticated, choosing add or remove
    ChoosingAction,
    /// Collecting the address for an add
    AwaitingAddress,
    /// Collecting the justification
    AwaitingReason { address: Address },
    /// Collecting the provenance label
    AwaitingSource { address: Address, reason: String },
    /// Collecting the address for a remove
    AwaitingRemoveAddress,
    /// A commit effect is being executed by the driver
    Committing,
    /// Terminal; the session no longer accepts input
    Done { outcome: SessionOutcome },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::AwaitingSecret => "awaiting_secret",
            SessionState::ChoosingAction => "choosing_action",
            SessionState::AwaitingAddress => "awaiting_address",
            SessionState::AwaitingReason { .. } => "awaiting_reason",
            SessionState::AwaitingSource { .. } => "awaiting_source",
            SessionState::AwaitingRemoveAddress => "awaiting_remove_address",
            SessionState::Committing => "committing",
            SessionState::Done { .. } => "done",
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Entry committed and persisted
    Added { address: Address },
    /// The address was already listed; nothing was overwritten
    AlreadyPresent {
        address: Address,
        existing_reason: String,
    },
    /// Entry removed; the previous reason is carried for display
    Removed { address: Address, reason: String },
    /// Nothing stored under this address
    NotFound { address: Address },
    /// Operator backed out
    Cancelled,
    /// Secret did not match; indistinguishable from a cancel to the
    /// operator, no retry offered
    Denied,
}

impl SessionOutcome {
    /// Ready-to-send operator text
    pub fn message(&self) -> String {
        match self {
            SessionOutcome::Added { address } => {
                format!("✅ {} added to the blocklist", address)
            }
            SessionOutcome::AlreadyPresent {
                address,
                existing_reason,
            } => {
                format!("ℹ️ {} is already blocklisted: {}", address, existing_reason)
            }
            SessionOutcome::Removed { address, reason } => {
                format!("🗑️ {} removed from the blocklist (was: {})", address, reason)
            }
            SessionOutcome::NotFound { address } => {
                format!("❌ {} is not on the blocklist", address)
            }
            SessionOutcome::Cancelled => "🚪 Session cancelled".to_string(),
            SessionOutcome::Denied => "🚪 Session closed".to_string(),
        }
    }
}

/// What the operator should be asked next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPrompt {
    EnterSecret,
    ChooseAction,
    EnterAddress,
    AddressRejected,
    EnterReason,
    EnterSource,
    EnterRemoveAddress,
}

impl SessionPrompt {
    pub fn text(&self) -> &'static str {
        match self {
            SessionPrompt::EnterSecret => "🔐 Enter the edit secret (or cancel)",
            SessionPrompt::ChooseAction => "Choose an action: add / remove (or cancel)",
            SessionPrompt::EnterAddress => "Send the address to blocklist",
            SessionPrompt::AddressRejected => {
                "❌ That does not look like a valid address, try again (or cancel)"
            }
            SessionPrompt::EnterReason => "Why is this address being blocklisted?",
            SessionPrompt::EnterSource => "Where does this intel come from? (send - to skip)",
            SessionPrompt::EnterRemoveAddress => "Send the address to remove",
        }
    }
}

/// What the driver must do after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Show the next prompt, keep the session alive
    Prompt(SessionPrompt),
    /// Apply an add against the store, then finish
    CommitAdd {
        address: Address,
        reason: String,
        source: String,
    },
    /// Apply a remove against the store, then finish
    CommitRemove { address: Address },
    /// The session is over
    Terminated(SessionOutcome),
}

fn is_cancel(input: &str) -> bool {
    CANCEL_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}

fn terminal(outcome: SessionOutcome) -> (SessionState, SessionEffect) {
    (
        SessionState::Done {
            outcome: outcome.clone(),
        },
        SessionEffect::Terminated(outcome),
    )
}

/// Pure transition function: one operator input against one state.
///
/// Total over all states; never touches the store. Commit effects carry
/// everything the driver needs, so the machine holds no hidden context.
pub fn step(state: SessionState, input: &str, policy: &SessionPolicy) -> (SessionState, SessionEffect) {
    let input = input.trim();

    if is_cancel(input) && !matches!(state, SessionState::Done { .. }) {
        return terminal(SessionOutcome::Cancelled);
    }

    match state {
        SessionState::AwaitingSecret => {
            if policy.secret_matches(input) {
                (
                    SessionState::ChoosingAction,
                    SessionEffect::Prompt(SessionPrompt::ChooseAction),
                )
            } else {
                // one attempt only; a failed gate looks like a cancel
                terminal(SessionOutcome::Denied)
            }
        }

        SessionState::ChoosingAction => match input.to_lowercase().as_str() {
            "add" | "/add" => (
                SessionState::AwaitingAddress,
                SessionEffect::Prompt(SessionPrompt::EnterAddress),
            ),
            "remove" | "/remove" => (
                SessionState::AwaitingRemoveAddress,
                SessionEffect::Prompt(SessionPrompt::EnterRemoveAddress),
            ),
            _ => (
                SessionState::ChoosingAction,
                SessionEffect::Prompt(SessionPrompt::ChooseAction),
            ),
        },

        SessionState::AwaitingAddress => match validate_address(input, policy.network) {
            Ok(address) => (
                SessionState::AwaitingReason { address },
                SessionEffect::Prompt(SessionPrompt::EnterReason),
            ),
            Err(_) => (
                SessionState::AwaitingAddress,
                SessionEffect::Prompt(SessionPrompt::AddressRejected),
            ),
        },

        SessionState::AwaitingReason { address } => {
            if input.is_empty() {
                (
                    SessionState::AwaitingReason { address },
                    SessionEffect::Prompt(SessionPrompt::EnterReason),
                )
            } else {
                (
                    SessionState::AwaitingSource {
                        address,
                        reason: input.to_string(),
                    },
                    SessionEffect::Prompt(SessionPrompt::EnterSource),
                )
            }
        }

        SessionState::AwaitingSource { address, reason } => {
            let source = normalize_source_label(input);
            (
                SessionState::Committing,
                SessionEffect::CommitAdd {
                    address,
                    reason,
                    source,
                },
            )
        }

        SessionState::AwaitingRemoveAddress => match validate_address(input, policy.network) {
            Ok(address) => (
                SessionState::Committing,
                SessionEffect::CommitRemove { address },
            ),
            Err(_) => (
                SessionState::AwaitingRemoveAddress,
                SessionEffect::Prompt(SessionPrompt::AddressRejected),
            ),
        },

        // the driver resolves a commit in the same call that produced it;
        // input can only reach here through misuse
        SessionState::Committing => terminal(SessionOutcome::Cancelled),

        SessionState::Done { outcome } => terminal(outcome),
    }
}

// ============================================
// DRIVER
// ============================================

/// Opaque reference to a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(pub Uuid);

impl SessionHandle {
    pub fn parse(raw: &str) -> AppResult<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| AppError::bad_request("Invalid session handle"))
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a session call hands back to the adapter
#[derive(Debug, Clone, Serialize)]
pub struct SessionReply {
    /// Name of the state the session is now in
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<SessionPrompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SessionOutcome>,
    /// Ready-to-send operator text
    pub message: String,
}

impl SessionReply {
    fn prompting(state: &'static str, prompt: SessionPrompt) -> Self {
        Self {
            state,
            prompt: Some(prompt),
            outcome: None,
            message: prompt.text().to_string(),
        }
    }

    fn done(outcome: SessionOutcome) -> Self {
        Self {
            state: "done",
            prompt: None,
            message: outcome.message(),
            outcome: Some(outcome),
        }
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_some()
    }
}

struct ActiveSession {
    operator: String,
    state: SessionState,
    touched: Instant,
}

/// Owns every live edit session and executes commit effects.
///
/// Steps on one handle are atomic: the session is taken out of the map,
/// stepped, and only put back if it survived. Concurrent submits on the
/// same handle therefore cannot interleave a transition.
pub struct EditSessionManager {
    sessions: DashMap<Uuid, ActiveSession>,
    policy: SessionPolicy,
    store: Arc<BlocklistStore>,
    telemetry: Arc<EngineTelemetry>,
    ttl: Duration,
}

impl EditSessionManager {
    pub fn new(
        policy: SessionPolicy,
        store: Arc<BlocklistStore>,
        telemetry: Arc<EngineTelemetry>,
        ttl: Duration,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            policy,
            store,
            telemetry,
            ttl,
        }
    }

    /// Open a session for an operator. The first prompt asks for the
    /// secret; nothing is privileged until it matches.
    pub fn begin(&self, operator: &str) -> (SessionHandle, SessionReply) {
        let handle = SessionHandle(Uuid::new_v4());
        self.sessions.insert(
            handle.0,
            ActiveSession {
                operator: operator.to_string(),
                state: SessionState::AwaitingSecret,
                touched: Instant::now(),
            },
        );
        self.telemetry.record_session_started();
        info!("🗝️ Edit session opened for {}", operator);

        (
            handle,
            SessionReply::prompting(
                SessionState::AwaitingSecret.name(),
                SessionPrompt::EnterSecret,
            ),
        )
    }

    /// Feed one operator input into a session.
    ///
    /// Commit effects are resolved here, against the store, before the
    /// reply is produced; a terminal reply means the session is gone.
    pub async fn submit(&self, handle: &SessionHandle, input: &str) -> AppResult<SessionReply> {
        let (_, mut active) = self
            .sessions
            .remove(&handle.0)
            .ok_or_else(AppError::session_not_found)?;

        if active.touched.elapsed() > self.ttl {
            info!("⌛ Session for {} expired", active.operator);
            return Err(AppError::session_expired());
        }

        let (next_state, effect) = step(active.state, input, &self.policy);

        match effect {
            SessionEffect::Prompt(prompt) => {
                active.state = next_state;
                active.touched = Instant::now();
                let reply = SessionReply::prompting(active.state.name(), prompt);
                self.sessions.insert(handle.0, active);
                Ok(reply)
            }

            SessionEffect::Terminated(outcome) => {
                if matches!(outcome, SessionOutcome::Denied) {
                    self.telemetry.record_session_denied();
                    warn!("⛔ Secret mismatch, session for {} denied", active.operator);
                } else {
                    info!("🚪 Session for {} closed", active.operator);
                }
                Ok(SessionReply::done(outcome))
            }

            SessionEffect::CommitAdd {
                address,
                reason,
                source,
            } => {
                let outcome = match self
                    .store
                    .add(&address, &reason, &source, &active.operator)
                    .await
                {
                    Ok(AddOutcome::Added) => {
                        self.telemetry.record_entry_added();
                        SessionOutcome::Added { address }
                    }
                    Ok(AddOutcome::AlreadyPresent(existing)) => SessionOutcome::AlreadyPresent {
                        address,
                        existing_reason: existing.reason,
                    },
                    Err(e) => {
                        // the session ends here either way; the store
                        // rolled the mutation back itself
                        warn!("⚠️ Commit failed for {}: {}", active.operator, e);
                        return Err(e);
                    }
                };
                Ok(SessionReply::done(outcome))
            }

            SessionEffect::CommitRemove { address } => {
                let outcome = match self.store.remove(&address).await {
                    Ok(RemoveOutcome::Removed(previous)) => {
                        self.telemetry.record_entry_removed();
                        SessionOutcome::Removed {
                            address,
                            reason: previous.reason,
                        }
                    }
                    Ok(RemoveOutcome::NotFound) => SessionOutcome::NotFound { address },
                    Err(e) => {
                        warn!("⚠️ Commit failed for {}: {}", active.operator, e);
                        return Err(e);
                    }
                };
                Ok(SessionReply::done(outcome))
            }
        }
    }

    /// Number of live sessions
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions that idled past the lifetime; returns how many went
    pub fn sweep_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, s| s.touched.elapsed() <= ttl);
        before - self.sessions.len()
    }
}

/// Background sweep so abandoned sessions do not pile up
pub fn start_expiry_sweep(manager: Arc<EditSessionManager>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = manager.sweep_expired();
            if removed > 0 {
                info!("🧹 {} idle edit sessions expired", removed);
            }
        }
    });
}
