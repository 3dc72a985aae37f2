//! Processed-comment ledger
//!
//! A JSON file recording which review comments (and sessions) have already
//! been handled. Ids only ever get added. Every mutation writes a temp file and
//! renames it over the ledger before returning, so a crash loses at most the
//! mutation in flight and never leaves a torn file behind.
//!
//! A missing or corrupt file loads as an empty ledger. After corruption the
//! next run may act on old comments once more; that is accepted because
//! at-most-once only depends on the ledger growing monotonically from
//! whatever state it was loaded in.

use chrono::{DateTime, Utc};
use jules_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Metadata kept for a session the automator started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub title: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    /// PR url once the session produced one
    #[serde(default)]
    pub pull_request: Option<String>,
}

impl ActiveSession {
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            created_at: Utc::now(),
            pull_request: None,
        }
    }
}

/// On-disk shape of the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub processed_comments: BTreeSet<u64>,
    #[serde(default)]
    pub processed_sessions: BTreeSet<String>,
    #[serde(default)]
    pub active_sessions: BTreeMap<String, ActiveSession>,
}

/// Durable, append-only record of handled review comments
#[derive(Debug, Clone)]
pub struct ProcessedLedger {
    path: PathBuf,
    state: LedgerState,
}

impl ProcessedLedger {
    /// Load the ledger at `path`, degrading to empty when absent or corrupt
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = Self::read_state(&path).await;
        Self { path, state }
    }

    async fn read_state(path: &Path) -> LedgerState {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No ledger at {:?}, starting empty", path);
                return LedgerState::default();
            }
            Err(e) => {
                warn!("Failed to read ledger {:?}, starting empty: {}", path, e);
                return LedgerState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    "Ledger {:?} is corrupt, starting empty \
                     (previously handled comments may be processed again): {}",
                    path, e
                );
                LedgerState::default()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn is_processed(&self, comment_id: u64) -> bool {
        self.state.processed_comments.contains(&comment_id)
    }

    pub fn processed_comments(&self) -> &BTreeSet<u64> {
        &self.state.processed_comments
    }

    /// Record a comment as handled and flush
    ///
    /// Returns `false` without touching the file if it was already recorded.
    pub async fn mark_processed(&mut self, comment_id: u64) -> Result<bool> {
        if self.is_processed(comment_id) {
            return Ok(false);
        }

        let mut next = self.state.clone();
        next.processed_comments.insert(comment_id);
        self.commit(next).await?;
        debug!("Marked comment {} processed", comment_id);
        Ok(true)
    }

    pub fn is_session_processed(&self, session_id: &str) -> bool {
        self.state.processed_sessions.contains(session_id)
    }

    /// Record a session as finished and flush; it leaves the active set
    pub async fn mark_session_processed(&mut self, session_id: &str) -> Result<bool> {
        let mut next = self.state.clone();
        let removed = next.active_sessions.remove(session_id).is_some();
        let inserted = next.processed_sessions.insert(session_id.to_string());
        if !inserted && !removed {
            return Ok(false);
        }

        self.commit(next).await?;
        info!("Marked session {} processed", session_id);
        Ok(inserted)
    }

    pub fn active_sessions(&self) -> &BTreeMap<String, ActiveSession> {
        &self.state.active_sessions
    }

    /// Remember a session the automator started and flush
    pub async fn track_session(&mut self, session_id: &str, session: ActiveSession) -> Result<()> {
        let mut next = self.state.clone();
        next.active_sessions.insert(session_id.to_string(), session);
        self.commit(next).await
    }

    /// Attach a PR url to a tracked session and flush
    ///
    /// Untracked sessions are left alone.
    pub async fn record_pull_request(&mut self, session_id: &str, url: &str) -> Result<bool> {
        let mut next = self.state.clone();
        match next.active_sessions.get_mut(session_id) {
            Some(active) if active.pull_request.as_deref() != Some(url) => {
                active.pull_request = Some(url.to_string());
            }
            _ => return Ok(false),
        }

        self.commit(next).await?;
        Ok(true)
    }

    /// Rewrite the ledger file from the in-memory state
    pub async fn flush(&self) -> Result<()> {
        write_state(&self.path, &self.state).await
    }

    /// Persist `next`, adopting it only once it is on disk
    async fn commit(&mut self, next: LedgerState) -> Result<()> {
        write_state(&self.path, &next).await?;
        self.state = next;
        Ok(())
    }
}

/// Write to a sibling temp file, then rename over the ledger
async fn write_state(path: &Path, state: &LedgerState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let json = serde_json::to_string_pretty(state)?;
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let ledger = ProcessedLedger::load(dir.path().join("ledger.json")).await;

        assert!(ledger.processed_comments().is_empty());
        assert!(ledger.active_sessions().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_after_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = ProcessedLedger::load(&path).await;
        assert!(ledger.mark_processed(42).await.unwrap());

        let reloaded = ProcessedLedger::load(&path).await;
        assert!(reloaded.is_processed(42));
        assert!(!reloaded.is_processed(43));
    }

    #[tokio::test]
    async fn test_mark_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut ledger = ProcessedLedger::load(dir.path().join("ledger.json")).await;

        assert!(ledger.mark_processed(7).await.unwrap());
        assert!(!ledger.mark_processed(7).await.unwrap());
        assert_eq!(ledger.processed_comments().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let mut ledger = ProcessedLedger::load(&path).await;
        assert!(ledger.processed_comments().is_empty());

        // Next mutation replaces the corrupt file with a valid one
        ledger.mark_processed(1).await.unwrap();
        let reloaded = ProcessedLedger::load(&path).await;
        assert!(reloaded.is_processed(1));
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/ledger.json");

        let mut ledger = ProcessedLedger::load(&path).await;
        ledger.mark_processed(5).await.unwrap();
        ledger
            .track_session("s1", ActiveSession::new("Task", "sources/github/o/r"))
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(raw["processed_comments"], serde_json::json!([5]));
        assert_eq!(raw["processed_sessions"], serde_json::json!([]));
        assert_eq!(raw["active_sessions"]["s1"]["title"], "Task");
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        tokio::fs::write(&path, r#"{"processed_comments":[3,4]}"#)
            .await
            .unwrap();

        let ledger = ProcessedLedger::load(&path).await;
        assert!(ledger.is_processed(3));
        assert!(ledger.is_processed(4));
        assert!(ledger.state().processed_sessions.is_empty());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut ledger = ProcessedLedger::load(&path).await;

        ledger
            .track_session("s1", ActiveSession::new("Task", "src"))
            .await
            .unwrap();
        assert!(ledger
            .record_pull_request("s1", "https://github.com/o/r/pull/1")
            .await
            .unwrap());
        assert!(!ledger.record_pull_request("unknown", "x").await.unwrap());

        assert!(ledger.mark_session_processed("s1").await.unwrap());
        assert!(!ledger.mark_session_processed("s1").await.unwrap());

        let reloaded = ProcessedLedger::load(&path).await;
        assert!(reloaded.is_session_processed("s1"));
        assert!(reloaded.active_sessions().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_flush_replaces_file() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let mut ledger = ProcessedLedger::load(&path).await;

        ledger.mark_processed(1).await.unwrap();
        let before = std::fs::metadata(&path).unwrap().ino();
        ledger.mark_processed(2).await.unwrap();
        let after = std::fs::metadata(&path).unwrap().ino();

        assert_ne!(before, after);
        assert!(!path.with_extension("json.tmp").exists());
        let reloaded = ProcessedLedger::load(&path).await;
        assert_eq!(reloaded.processed_comments().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_memory_in_step() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("ledger.json");

        let mut ledger = ProcessedLedger::load(&path).await;
        assert!(ledger.mark_processed(1).await.is_err());
        assert!(!ledger.is_processed(1));
        assert!(ledger
            .track_session("s1", ActiveSession::new("Task", "src"))
            .await
            .is_err());
        assert!(ledger.active_sessions().is_empty());

        // Once the directory can be created the retry writes through
        std::fs::remove_file(&blocker).unwrap();
        assert!(ledger.mark_processed(1).await.unwrap());
        let reloaded = ProcessedLedger::load(&path).await;
        assert!(reloaded.is_processed(1));
    }
}
