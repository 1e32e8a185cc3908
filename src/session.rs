//! Host-side ownership of the current ledger view.
//!
//! The session holds exactly one current `LedgerView`. A refresh fetches a
//! new snapshot, derives its report and index, and swaps the whole view in
//! under one write lock, so readers always see a report and an index built
//! from the same snapshot.

use crate::blockchain::{ChainValidator, LedgerSnapshot, SnapshotId, ValidationPolicy, ValidationReport};
use crate::cache::ViewCache;
use crate::error::LedgerError;
use crate::index::LedgerIndex;
use crate::source::SnapshotSource;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Loading,
    Ready,
    Degraded,
}

/// A snapshot together with everything derived from it.
#[derive(Debug)]
pub struct LedgerView {
    pub snapshot: Arc<LedgerSnapshot>,
    pub policy: ValidationPolicy,
    pub report: ValidationReport,
    pub index: LedgerIndex,
}

impl LedgerView {
    pub fn build(snapshot: Arc<LedgerSnapshot>, policy: ValidationPolicy) -> Self {
        let report = ChainValidator::new(policy).validate(&snapshot);
        let index = LedgerIndex::build(&snapshot);
        LedgerView {
            snapshot,
            policy,
            report,
            index,
        }
    }

    pub fn summary(&self) -> LedgerSummary {
        let tip = self.snapshot.tip();
        LedgerSummary {
            snapshot_id: self.snapshot.id(),
            blocks: self.snapshot.len(),
            transactions: self.snapshot.transaction_count(),
            tip_hash: tip.map(|b| b.hash.clone()),
            latest_block_timestamp: tip.map(|b| b.timestamp),
            valid: self.report.valid,
            issues: self.report.issues.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub snapshot_id: SnapshotId,
    pub blocks: usize,
    pub transactions: usize,
    pub tip_hash: Option<String>,
    pub latest_block_timestamp: Option<i64>,
    pub valid: bool,
    pub issues: usize,
}

pub struct LedgerSession {
    source: Arc<dyn SnapshotSource>,
    policy: ValidationPolicy,
    cache: ViewCache,
    current: RwLock<Option<Arc<LedgerView>>>,
    state: RwLock<SessionState>,
    /// Serializes refreshes so an older fetch can never overwrite a newer one
    refresh_lock: Mutex<()>,
    refreshes: AtomicU64,
}

impl LedgerSession {
    pub fn new(source: Arc<dyn SnapshotSource>, policy: ValidationPolicy, cache: ViewCache) -> Self {
        Self {
            source,
            policy,
            cache,
            current: RwLock::new(None),
            state: RwLock::new(SessionState::Idle),
            refresh_lock: Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Fetch a new snapshot and make it current.
    ///
    /// On failure the previous view stays in place and the session is marked
    /// `Degraded`. The work runs on its own task: dropping the returned future
    /// does not interrupt a refresh that has started, so the session never
    /// stays `Loading`.
    pub async fn refresh(self: &Arc<Self>) -> Result<Arc<LedgerView>, LedgerError> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.fetch_and_swap().await })
            .await
            .map_err(|e| LedgerError::SourceError(format!("Refresh task failed: {}", e)))?
    }

    async fn fetch_and_swap(&self) -> Result<Arc<LedgerView>, LedgerError> {
        let _guard = self.refresh_lock.lock().await;
        *self.state.write().await = SessionState::Loading;

        let source = Arc::clone(&self.source);
        let fetched = tokio::task::spawn_blocking(move || source.fetch())
            .await
            .map_err(|e| LedgerError::SourceError(format!("Fetch task failed: {}", e)))
            .and_then(|result| result);

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "snapshot refresh failed");
                *self.state.write().await = SessionState::Degraded;
                return Err(e);
            }
        };

        let view = match self.cache.get(snapshot.id(), self.policy).await {
            Some(view) => {
                debug!(snapshot = %snapshot.id(), "reusing cached ledger view");
                view
            }
            None => {
                let view = Arc::new(LedgerView::build(Arc::new(snapshot), self.policy));
                self.cache.put(Arc::clone(&view)).await;
                view
            }
        };

        *self.current.write().await = Some(Arc::clone(&view));
        *self.state.write().await = SessionState::Ready;
        self.refreshes.fetch_add(1, Ordering::Relaxed);

        info!(
            source = %self.source.describe(),
            snapshot = %view.snapshot.id(),
            blocks = view.snapshot.len(),
            valid = view.report.valid,
            issues = view.report.issues.len(),
            "ledger snapshot refreshed"
        );

        Ok(view)
    }

    pub async fn current(&self) -> Option<Arc<LedgerView>> {
        self.current.read().await.clone()
    }

    /// Validity flag of the current view. Before anything has loaded the
    /// ledger is presumed valid.
    pub async fn is_valid(&self) -> bool {
        match self.current.read().await.as_ref() {
            Some(view) => view.report.valid,
            None => true,
        }
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Block, IssueKind};
    use crate::source::StaticSource;
    use crate::transaction::Transaction;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    /// Serves a snapshot until told to fail.
    struct FlakySource {
        snapshot: LedgerSnapshot,
        failing: AtomicBool,
    }

    impl SnapshotSource for FlakySource {
        fn fetch(&self) -> Result<LedgerSnapshot, LedgerError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(LedgerError::SourceError("service unavailable".to_string()))
            } else {
                Ok(self.snapshot.clone())
            }
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    /// Blocks the fetching thread before serving its snapshot.
    struct SlowSource {
        snapshot: LedgerSnapshot,
        delay: Duration,
    }

    impl SnapshotSource for SlowSource {
        fn fetch(&self) -> Result<LedgerSnapshot, LedgerError> {
            std::thread::sleep(self.delay);
            Ok(self.snapshot.clone())
        }

        fn describe(&self) -> String {
            "slow".to_string()
        }
    }

    fn sample_snapshot() -> LedgerSnapshot {
        LedgerSnapshot::from_chain(vec![
            Block {
                index: 0,
                timestamp: 10,
                transactions: vec![],
                previous_hash: String::new(),
                hash: "0a".into(),
                nonce: 0,
                difficulty: 1,
            },
            Block {
                index: 1,
                timestamp: 20,
                transactions: vec![Transaction::new("t1", "alice", "bob", 2.0, 15)],
                previous_hash: "0a".into(),
                hash: "bad".into(),
                nonce: 7,
                difficulty: 1,
            },
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_publishes_view() {
        let session = Arc::new(LedgerSession::new(
            Arc::new(StaticSource::new(sample_snapshot())),
            ValidationPolicy::default(),
            ViewCache::default(),
        ));
        assert_eq!(session.state().await, SessionState::Idle);
        assert!(session.is_valid().await);
        assert!(session.current().await.is_none());

        let view = session.refresh().await.unwrap();
        assert_eq!(session.state().await, SessionState::Ready);
        assert!(!session.is_valid().await);
        assert!(view.index.is_for(&view.snapshot));
        assert_eq!(view.index.find_block_of("t1").unwrap(), 1);

        let summary = view.summary();
        assert_eq!(summary.blocks, 2);
        assert_eq!(summary.transactions, 1);
        assert_eq!(summary.tip_hash.as_deref(), Some("bad"));
        assert_eq!(summary.issues, 1);
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_reuses_view() {
        let session = Arc::new(LedgerSession::new(
            Arc::new(StaticSource::new(sample_snapshot())),
            ValidationPolicy::default(),
            ViewCache::default(),
        ));
        let first = session.refresh().await.unwrap();
        let second = session.refresh().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(session.refresh_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_view() {
        let source = Arc::new(FlakySource {
            snapshot: sample_snapshot(),
            failing: AtomicBool::new(false),
        });
        let session = Arc::new(LedgerSession::new(
            source.clone(),
            ValidationPolicy::default(),
            ViewCache::default(),
        ));
        let before = session.refresh().await.unwrap();

        source.failing.store(true, Ordering::SeqCst);
        let err = session.refresh().await.unwrap_err();
        assert!(matches!(err, LedgerError::SourceError(_)));
        assert_eq!(session.state().await, SessionState::Degraded);

        let after = session.current().await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(session.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_shared_cache_respects_each_policy() {
        let snapshot = LedgerSnapshot::from_chain(vec![Block {
            index: 0,
            timestamp: 10,
            transactions: vec![],
            previous_hash: String::new(),
            hash: "ffff".into(),
            nonce: 0,
            difficulty: 3,
        }])
        .unwrap();
        let cache = ViewCache::default();

        let lenient = Arc::new(LedgerSession::new(
            Arc::new(StaticSource::new(snapshot.clone())),
            ValidationPolicy::default(),
            cache.clone(),
        ));
        let strict = Arc::new(LedgerSession::new(
            Arc::new(StaticSource::new(snapshot)),
            ValidationPolicy::strict(),
            cache.clone(),
        ));

        let lenient_view = lenient.refresh().await.unwrap();
        assert!(lenient_view.report.valid);

        let strict_view = strict.refresh().await.unwrap();
        assert!(!strict_view.report.valid);
        assert_eq!(strict_view.report.issues.len(), 1);
        assert_eq!(strict_view.report.issues[0].block_index, 0);
        assert_eq!(
            strict_view.report.issues[0].kind,
            IssueKind::DifficultyNotMet { required: 3 }
        );
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_cancelled_refresh_still_completes() {
        let session = Arc::new(LedgerSession::new(
            Arc::new(SlowSource {
                snapshot: sample_snapshot(),
                delay: Duration::from_millis(300),
            }),
            ValidationPolicy::default(),
            ViewCache::default(),
        ));

        let attempt = tokio::time::timeout(Duration::from_millis(50), session.refresh()).await;
        assert!(attempt.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(session.state().await, SessionState::Ready);
        assert!(session.current().await.is_some());
        assert_eq!(session.refresh_count(), 1);
    }
}
