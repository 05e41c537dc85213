//! Blocklist Store - Persisted Address Blocklist
//!
//! Sole owner of the blocklist: a canonical-address keyed map behind one
//! async lock, mirrored to a JSON file. The lock spans both the in-memory
//! mutation and the persist, so concurrent editors serialize and readers
//! never observe a half-applied change. Writes go to a temp file first and
//! are renamed into place; a crash mid-save leaves the previous file whole.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::address::Address;
use crate::models::errors::AppResult;
use crate::models::types::BlocklistEntry;
use crate::utils::constants::DEFAULT_ENTRY_SOURCE;

/// Outcome of an add: preconditions are reported, not raised
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// Entry committed and persisted
    Added,
    /// An entry already exists; carried so callers can show its reason.
    /// The stored entry is never overwritten.
    AlreadyPresent(BlocklistEntry),
}

/// Outcome of a remove
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    /// Entry removed; the previous record is carried for display
    Removed(BlocklistEntry),
    /// Nothing stored under this address
    NotFound,
}

/// Normalize an operator-supplied provenance label.
/// Empty input and the "-" skip marker both become the manual default.
pub fn normalize_source_label(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        DEFAULT_ENTRY_SOURCE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// The persisted blocklist
pub struct BlocklistStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, BlocklistEntry>>,
}

impl BlocklistStore {
    /// Load the store from disk. A missing file is a first run, not an
    /// error; a present-but-corrupt file is refused so a typo'd path or a
    /// damaged store cannot silently shadow real entries.
    pub async fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();

        let entries: HashMap<String, BlocklistEntry> =
            match tokio::fs::read_to_string(&path).await {
                Ok(raw) => serde_json::from_str(&raw)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    info!("🗂️ No blocklist at {}, starting empty", path.display());
                    HashMap::new()
                }
                Err(e) => return Err(e.into()),
            };

        if !entries.is_empty() {
            info!(
                "🗂️ Blocklist loaded: {} entries from {}",
                entries.len(),
                path.display()
            );
        }

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Read-only lookup by canonical address
    pub async fn lookup(&self, address: &Address) -> Option<BlocklistEntry> {
        self.entries.lock().await.get(address.as_str()).cloned()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Add an entry. Never overwrites: a duplicate reports the existing
    /// entry instead. On persist failure the insert is rolled back so
    /// memory and disk stay in agreement.
    pub async fn add(
        &self,
        address: &Address,
        reason: &str,
        source: &str,
        added_by: &str,
    ) -> AppResult<AddOutcome> {
        let mut entries = self.entries.lock().await;

        if let Some(existing) = entries.get(address.as_str()) {
            debug!("⏭️ {} already blocklisted ({})", address.short(), existing.reason);
            return Ok(AddOutcome::AlreadyPresent(existing.clone()));
        }

        let entry = BlocklistEntry {
            reason: reason.trim().to_string(),
            source: normalize_source_label(source),
            added_by: added_by.to_string(),
            added_at: Utc::now(),
        };
        entries.insert(address.as_str().to_string(), entry);

        if let Err(e) = self.persist(&entries).await {
            entries.remove(address.as_str());
            warn!("⚠️ Persist failed, add of {} rolled back: {}", address.short(), e);
            return Err(e);
        }

        info!("➕ Blocklisted {} (by {})", address, added_by);
        Ok(AddOutcome::Added)
    }

    /// Remove an entry, reporting the previous record. On persist failure
    /// the removal is rolled back.
    pub async fn remove(&self, address: &Address) -> AppResult<RemoveOutcome> {
        let mut entries = self.entries.lock().await;

        let Some(previous) = entries.remove(address.as_str()) else {
            return Ok(RemoveOutcome::NotFound);
        };

        if let Err(e) = self.persist(&entries).await {
            entries.insert(address.as_str().to_string(), previous);
            warn!(
                "⚠️ Persist failed, remove of {} rolled back: {}",
                address.short(),
                e
            );
            return Err(e);
        }

        info!("➖ Removed {} from blocklist", address);
        Ok(RemoveOutcome::Removed(previous))
    }

    /// Full rewrite of the store file: temp file next to the target, then
    /// an atomic rename over it.
    async fn persist(&self, entries: &HashMap<String, BlocklistEntry>) -> AppResult<()> {
        let json = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("💾 Blocklist persisted ({} entries)", entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::address::validate_address;
    use crate::utils::constants::PROFILE_ETHEREUM;
    use uuid::Uuid;

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir().join(format!("aml-sentry-test-{}.json", Uuid::new_v4()))
    }

    fn addr(raw: &str) -> Address {
        validate_address(raw, &PROFILE_ETHEREUM).unwrap()
    }

    fn addr_a() -> Address {
        addr("0x1f9090aae28b8a3dceadf281b0f12828e676c326")
    }

    fn addr_b() -> Address {
        addr("0x7a250d5630b4cf539739df2c5dacb4c659f2488d")
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let store = BlocklistStore::load(temp_store_path()).await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.lookup(&addr_a()).await.is_none());
    }

    #[tokio::test]
    async fn test_add_lookup_remove_cycle() {
        let path = temp_store_path();
        let store = BlocklistStore::load(path.clone()).await.unwrap();

        let outcome = store
            .add(&addr_a(), "phishing campaign", "chainalysis", "ops")
            .await
            .unwrap();
        assert_eq!(outcome, AddOutcome::Added);

        let entry = store.lookup(&addr_a()).await.unwrap();
        assert_eq!(entry.reason, "phishing campaign");
        assert_eq!(entry.source, "chainalysis");
        assert_eq!(entry.added_by, "ops");

        match store.remove(&addr_a()).await.unwrap() {
            RemoveOutcome::Removed(previous) => {
                assert_eq!(previous.reason, "phishing campaign");
                assert_eq!(previous.source, "chainalysis");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(store.lookup(&addr_a()).await.is_none());
        assert_eq!(store.remove(&addr_a()).await.unwrap(), RemoveOutcome::NotFound);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_duplicate_add_reports_existing_without_overwrite() {
        let path = temp_store_path();
        let store = BlocklistStore::load(path.clone()).await.unwrap();

        store
            .add(&addr_a(), "original reason", "osint", "alice")
            .await
            .unwrap();

        match store.add(&addr_a(), "new reason", "other", "bob").await.unwrap() {
            AddOutcome::AlreadyPresent(existing) => {
                assert_eq!(existing.reason, "original reason");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // stored entry untouched
        let entry = store.lookup(&addr_a()).await.unwrap();
        assert_eq!(entry.reason, "original reason");
        assert_eq!(entry.added_by, "alice");

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_empty_source_defaults_to_manual() {
        let path = temp_store_path();
        let store = BlocklistStore::load(path.clone()).await.unwrap();

        store.add(&addr_a(), "mixer proximity", "", "ops").await.unwrap();
        store.add(&addr_b(), "scam report", "-", "ops").await.unwrap();

        assert_eq!(store.lookup(&addr_a()).await.unwrap().source, "manual");
        assert_eq!(store.lookup(&addr_b()).await.unwrap().source, "manual");

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_entries_survive_reload() {
        let path = temp_store_path();

        {
            let store = BlocklistStore::load(path.clone()).await.unwrap();
            store
                .add(&addr_a(), "sanctioned entity", "ofac", "ops")
                .await
                .unwrap();
        }

        let reloaded = BlocklistStore::load(path.clone()).await.unwrap();
        assert_eq!(reloaded.len().await, 1);
        assert_eq!(
            reloaded.lookup(&addr_a()).await.unwrap().reason,
            "sanctioned entity"
        );

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_refused() {
        let path = temp_store_path();
        std::fs::write(&path, "{not valid json").unwrap();

        let result = BlocklistStore::load(path.clone()).await;
        assert!(result.is_err());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_adds_commit_exactly_once() {
        let path = temp_store_path();
        let store = std::sync::Arc::new(
            BlocklistStore::load(path.clone()).await.unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add(&addr_a(), &format!("racer {}", i), "", "ops")
                    .await
                    .unwrap()
            }));
        }

        let mut added = 0;
        let mut already = 0;
        for handle in handles {
            match handle.await.unwrap() {
                AddOutcome::Added => added += 1,
                AddOutcome::AlreadyPresent(_) => already += 1,
            }
        }

        assert_eq!(added, 1);
        assert_eq!(already, 7);
        assert_eq!(store.len().await, 1);

        let _ = std::fs::remove_file(path);
    }
}
