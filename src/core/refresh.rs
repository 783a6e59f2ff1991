//! Refresh cycle: decides between a remote fetch and the cache, keeps the
//! quota counter and the gold blocks up to date.

use crate::core::cache::IndicatorCache;
use crate::core::clock::Clock;
use crate::core::error::IndicatorError;
use crate::core::gold::GoldBlock;
use crate::core::indicator::{IndicatorCode, IndicatorSnapshot};
use crate::core::quota::QuotaPolicy;
use crate::core::source::IndicatorSource;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub const REFRESH_ADVISORY: &str = "Could not refresh indicators, showing stored data.";
pub const NO_DATA_ADVISORY: &str = "No indicator data available.";
pub const EPHEMERAL_STORE_ADVISORY: &str =
    "Stored data is unavailable, the daily query limit is not being enforced.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Deciding,
    Fetching,
    CacheFallback,
    Rendered,
}

/// Where the rendered snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Fetched,
    Cached,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub snapshot: IndicatorSnapshot,
    pub origin: SnapshotOrigin,
    /// Empty when the cycle finished without a user-visible problem.
    pub advisory: String,
    /// Writes the store rejected during the cycle. They never block rendering.
    pub cache_errors: Vec<IndicatorError>,
}

/// Receives the result of a refresh cycle.
pub trait Presenter {
    fn render(&self, snapshot: &IndicatorSnapshot, advisory: &str);
}

pub struct RefreshOrchestrator {
    source: Arc<dyn IndicatorSource>,
    cache: IndicatorCache,
    clock: Arc<dyn Clock>,
    policy: QuotaPolicy,
    // Serializes cycles; a new cycle starts only after the previous one ends.
    cycle: Mutex<()>,
    storage_notice: Option<String>,
}

impl RefreshOrchestrator {
    pub fn new(
        source: Arc<dyn IndicatorSource>,
        cache: IndicatorCache,
        clock: Arc<dyn Clock>,
        policy: QuotaPolicy,
    ) -> Self {
        Self {
            source,
            cache,
            clock,
            policy,
            cycle: Mutex::new(()),
            storage_notice: None,
        }
    }

    /// Appends `notice` to the advisory of every cycle, e.g. when the store
    /// does not outlive the process.
    pub fn with_storage_notice(mut self, notice: impl Into<String>) -> Self {
        self.storage_notice = Some(notice.into());
        self
    }

    pub fn cache(&self) -> &IndicatorCache {
        &self.cache
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Runs one refresh cycle and hands the result to `presenter`.
    pub async fn refresh_and_render(&self, presenter: &dyn Presenter) -> RefreshOutcome {
        let outcome = self.refresh().await;
        presenter.render(&outcome.snapshot, &outcome.advisory);
        outcome
    }

    #[instrument(name = "RefreshCycle", skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        let _cycle = self.cycle.lock().await;

        let now = self.clock.now();
        let day = now.date();

        let mut snapshot = None;
        let mut origin = SnapshotOrigin::Unavailable;
        let mut advisory = String::new();
        let mut cache_errors = Vec::new();

        let mut state = RefreshState::Idle;
        while state != RefreshState::Rendered {
            let next = match state {
                RefreshState::Idle => RefreshState::Deciding,
                RefreshState::Deciding => {
                    let quota = self.cache.load_quota(day).await;
                    if self.policy.can_fetch(now, &quota) {
                        RefreshState::Fetching
                    } else {
                        let reason = if self.policy.is_exhausted(&quota) {
                            IndicatorError::QuotaExhausted.to_string()
                        } else {
                            "outside fetch window".to_string()
                        };
                        debug!(count = quota.count, %reason, "Skipping remote fetch");
                        RefreshState::CacheFallback
                    }
                }
                RefreshState::Fetching => match self.source.fetch_snapshot().await {
                    Ok(mut fresh) => {
                        self.resolve_gold(now, &mut fresh, true, &mut cache_errors)
                            .await;

                        if let Err(e) = self.cache.save_snapshot(day, &fresh).await {
                            warn!(error = %e, "Failed to store snapshot");
                            cache_errors.push(e);
                        }
                        match self.cache.increment_quota(day, now).await {
                            Ok(quota) => info!(count = quota.count, "Indicators refreshed"),
                            Err(e) => {
                                warn!(error = %e, "Failed to update query counter");
                                cache_errors.push(e);
                            }
                        }

                        snapshot = Some(fresh);
                        origin = SnapshotOrigin::Fetched;
                        RefreshState::Rendered
                    }
                    Err(e) => {
                        warn!(error = %e, "Refresh failed, falling back to cache");
                        advisory = REFRESH_ADVISORY.to_string();
                        RefreshState::CacheFallback
                    }
                },
                RefreshState::CacheFallback => {
                    let mut fallback = match self.cache.load_snapshot(day).await {
                        Some(cached) => {
                            origin = SnapshotOrigin::Cached;
                            cached
                        }
                        None => {
                            warn!(error = %IndicatorError::NoDataAvailable, "Nothing cached for today");
                            if advisory.is_empty() {
                                advisory = NO_DATA_ADVISORY.to_string();
                            }
                            origin = SnapshotOrigin::Unavailable;
                            IndicatorSnapshot::unavailable()
                        }
                    };
                    self.resolve_gold(now, &mut fallback, false, &mut cache_errors)
                        .await;
                    snapshot = Some(fallback);
                    RefreshState::Rendered
                }
                RefreshState::Rendered => RefreshState::Rendered,
            };
            debug!(from = ?state, to = ?next, "Refresh state transition");
            state = next;
        }

        if let Some(notice) = &self.storage_notice {
            if advisory.is_empty() {
                advisory = notice.clone();
            } else {
                advisory = format!("{advisory} {notice}");
            }
        }

        RefreshOutcome {
            snapshot: snapshot.unwrap_or_default(),
            origin,
            advisory,
            cache_errors,
        }
    }

    /// Fills in gold from the current block, fetching it only when the block
    /// has no stored quote yet. `fresh` marks a snapshot fetched during this
    /// cycle, whose values the source may reuse.
    ///
    /// A failed gold fetch leaves the block unconsumed. The snapshot then
    /// keeps its own gold value, or takes the other block's stored quote,
    /// or the one in today's stored snapshot, in that order.
    async fn resolve_gold(
        &self,
        now: NaiveDateTime,
        snapshot: &mut IndicatorSnapshot,
        fresh: bool,
        cache_errors: &mut Vec<IndicatorError>,
    ) {
        let day = now.date();
        let block = GoldBlock::resolve(now);

        if let Some(quote) = self.cache.load_gold_block(day, block).await {
            debug!(%block, "Reusing stored gold quote");
            snapshot.set(IndicatorCode::Oro, quote.into());
            return;
        }

        let fetched = self.source.fetch_gold(fresh.then_some(&*snapshot)).await;
        match fetched {
            Ok(quote) => {
                if let Err(e) = self.cache.save_gold_block(day, block, &quote).await {
                    warn!(error = %e, %block, "Failed to store gold quote");
                    cache_errors.push(e);
                }
                snapshot.set(IndicatorCode::Oro, quote.into());
            }
            Err(e) => {
                warn!(error = %e, %block, "Gold refresh failed");
                if snapshot.get(IndicatorCode::Oro).is_available() {
                    return;
                }
                if let Some(quote) = self.cache.load_gold_block(day, block.other()).await {
                    debug!(block = %block.other(), "Using other block's gold quote");
                    snapshot.set(IndicatorCode::Oro, quote.into());
                } else if let Some(cached) = self.cache.load_snapshot(day).await {
                    snapshot.set(IndicatorCode::Oro, cached.get(IndicatorCode::Oro).clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::KeyValueStore;
    use crate::core::clock::FixedClock;
    use crate::core::error::Result;
    use crate::core::indicator::{GoldQuote, Reading};
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockSource {
        snapshot_calls: AtomicUsize,
        gold_calls: AtomicUsize,
        fail_snapshot: AtomicBool,
        fail_gold: AtomicBool,
        usd: f64,
    }

    impl MockSource {
        fn new(usd: f64) -> Self {
            Self {
                snapshot_calls: AtomicUsize::new(0),
                gold_calls: AtomicUsize::new(0),
                fail_snapshot: AtomicBool::new(false),
                fail_gold: AtomicBool::new(false),
                usd,
            }
        }

        fn snapshot_calls(&self) -> usize {
            self.snapshot_calls.load(Ordering::SeqCst)
        }

        fn gold_calls(&self) -> usize {
            self.gold_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IndicatorSource for MockSource {
        async fn fetch_snapshot(&self) -> Result<IndicatorSnapshot> {
            self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_snapshot.load(Ordering::SeqCst) {
                return Err(IndicatorError::Network("connection refused".to_string()));
            }
            let date = Some("2025-05-22T04:00:00.000Z".to_string());
            let mut snapshot = IndicatorSnapshot::new(date.clone());
            snapshot.set(IndicatorCode::Uf, Reading::new(Some(37_000.0), date.clone()));
            snapshot.set(IndicatorCode::Usd, Reading::new(Some(self.usd), date));
            Ok(snapshot)
        }

        async fn fetch_gold(&self, _fetched: Option<&IndicatorSnapshot>) -> Result<GoldQuote> {
            let calls = self.gold_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_gold.load(Ordering::SeqCst) {
                return Err(IndicatorError::Parse("bad gold payload".to_string()));
            }
            Ok(GoldQuote {
                value: 70_000.0 + calls as f64,
                timestamp: Some("2025-05-22T12:00:00Z".to_string()),
            })
        }
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        async fn put(&self, _key: &str, _value: String) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("store is full"))
        }
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 22)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn setup(now: NaiveDateTime) -> (RefreshOrchestrator, Arc<MockSource>, Arc<FixedClock>) {
        let source = Arc::new(MockSource::new(915.0));
        let clock = Arc::new(FixedClock::new(now));
        let cache = IndicatorCache::new(Arc::new(MemoryStore::new()));
        let orchestrator =
            RefreshOrchestrator::new(source.clone(), cache, clock.clone(), QuotaPolicy::default());
        (orchestrator, source, clock)
    }

    #[tokio::test]
    async fn test_each_allowed_refresh_counts_once() {
        let (orchestrator, source, _clock) = setup(at(9, 0));
        let day = at(9, 0).date();

        let first = orchestrator.refresh().await;
        assert_eq!(first.origin, SnapshotOrigin::Fetched);
        assert!(first.advisory.is_empty());
        assert_eq!(orchestrator.cache().load_quota(day).await.count, 1);

        let second = orchestrator.refresh().await;
        assert_eq!(second.origin, SnapshotOrigin::Fetched);
        assert_eq!(orchestrator.cache().load_quota(day).await.count, 2);
        assert_eq!(second.snapshot, first.snapshot);
        assert_eq!(source.snapshot_calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_quota_uses_cache() {
        let (orchestrator, source, _clock) = setup(at(10, 0));
        let day = at(10, 0).date();

        for _ in 0..4 {
            orchestrator.refresh().await;
        }
        assert_eq!(source.snapshot_calls(), 4);

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome.origin, SnapshotOrigin::Cached);
        assert!(outcome.advisory.is_empty());
        assert_eq!(outcome.snapshot.value(IndicatorCode::Usd), Some(915.0));
        assert_eq!(source.snapshot_calls(), 4);
        assert_eq!(orchestrator.cache().load_quota(day).await.count, 4);
    }

    #[tokio::test]
    async fn test_outside_window_without_cache_is_unavailable() {
        let (orchestrator, source, _clock) = setup(at(6, 59));
        source.fail_gold.store(true, Ordering::SeqCst);

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome.origin, SnapshotOrigin::Unavailable);
        assert_eq!(outcome.advisory, NO_DATA_ADVISORY);
        assert_eq!(source.snapshot_calls(), 0);
        assert_eq!(outcome.snapshot.value(IndicatorCode::Clp), Some(1.0));
        assert!(outcome.snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_returns_cached_snapshot() {
        let (orchestrator, source, clock) = setup(at(8, 0));
        let day = at(8, 0).date();

        let cached = orchestrator.refresh().await.snapshot;
        source.fail_snapshot.store(true, Ordering::SeqCst);
        clock.set(at(12, 0));

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome.origin, SnapshotOrigin::Cached);
        assert_eq!(outcome.advisory, REFRESH_ADVISORY);
        assert_eq!(outcome.snapshot, cached);
        assert_eq!(orchestrator.cache().load_quota(day).await.count, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_without_cache() {
        let (orchestrator, source, _clock) = setup(at(8, 0));
        source.fail_snapshot.store(true, Ordering::SeqCst);
        source.fail_gold.store(true, Ordering::SeqCst);

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome.origin, SnapshotOrigin::Unavailable);
        assert_eq!(outcome.advisory, REFRESH_ADVISORY);
        assert!(outcome.snapshot.is_empty());
        assert_eq!(
            orchestrator.cache().load_quota(at(8, 0).date()).await.count,
            0
        );
    }

    #[tokio::test]
    async fn test_gold_fetched_once_per_block() {
        let (orchestrator, source, clock) = setup(at(7, 59));

        let morning = orchestrator.refresh().await;
        assert_eq!(source.gold_calls(), 1);
        assert_eq!(morning.snapshot.value(IndicatorCode::Oro), Some(70_000.0));

        clock.set(at(15, 59));
        let late_morning = orchestrator.refresh().await;
        assert_eq!(source.gold_calls(), 1);
        assert_eq!(late_morning.snapshot.value(IndicatorCode::Oro), Some(70_000.0));

        clock.set(at(16, 0));
        let afternoon = orchestrator.refresh().await;
        assert_eq!(source.gold_calls(), 2);
        assert_eq!(afternoon.snapshot.value(IndicatorCode::Oro), Some(70_001.0));

        // Main quota spent, gold block already stored.
        clock.set(at(18, 0));
        orchestrator.refresh().await;
        let exhausted = orchestrator.refresh().await;
        assert_eq!(exhausted.origin, SnapshotOrigin::Cached);
        assert_eq!(source.snapshot_calls(), 4);
        assert_eq!(source.gold_calls(), 2);
        assert_eq!(exhausted.snapshot.value(IndicatorCode::Oro), Some(70_001.0));
    }

    #[tokio::test]
    async fn test_gold_refreshes_on_fallback_path() {
        let (orchestrator, source, clock) = setup(at(10, 0));
        for _ in 0..4 {
            orchestrator.refresh().await;
        }
        assert_eq!(source.gold_calls(), 1);

        // New block while the main quota is exhausted.
        clock.set(at(17, 0));
        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome.origin, SnapshotOrigin::Cached);
        assert_eq!(source.gold_calls(), 2);
        assert_eq!(outcome.snapshot.value(IndicatorCode::Oro), Some(70_001.0));
    }

    #[tokio::test]
    async fn test_gold_failure_does_not_abort_snapshot() {
        let (orchestrator, source, _clock) = setup(at(9, 0));
        source.fail_gold.store(true, Ordering::SeqCst);

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome.origin, SnapshotOrigin::Fetched);
        assert!(outcome.advisory.is_empty());
        assert!(outcome.snapshot.value(IndicatorCode::Oro).is_none());
        assert_eq!(outcome.snapshot.value(IndicatorCode::Uf), Some(37_000.0));
    }

    #[tokio::test]
    async fn test_cache_write_errors_do_not_block_rendering() {
        let source = Arc::new(MockSource::new(915.0));
        let orchestrator = RefreshOrchestrator::new(
            source.clone(),
            IndicatorCache::new(Arc::new(ReadOnlyStore)),
            Arc::new(FixedClock::new(at(9, 0))),
            QuotaPolicy::default(),
        );

        let outcome = orchestrator.refresh().await;
        assert_eq!(outcome.origin, SnapshotOrigin::Fetched);
        assert_eq!(outcome.snapshot.value(IndicatorCode::Usd), Some(915.0));
        // Gold block, snapshot and quota writes all fail.
        assert_eq!(outcome.cache_errors.len(), 3);
        assert!(
            outcome
                .cache_errors
                .iter()
                .all(|e| matches!(e, IndicatorError::CacheWrite(_)))
        );
    }

    #[tokio::test]
    async fn test_presenter_receives_outcome() {
        struct Recorder(RefCell<Vec<(Option<f64>, String)>>);

        impl Presenter for Recorder {
            fn render(&self, snapshot: &IndicatorSnapshot, advisory: &str) {
                self.0
                    .borrow_mut()
                    .push((snapshot.value(IndicatorCode::Uf), advisory.to_string()));
            }
        }

        let (orchestrator, source, _clock) = setup(at(9, 0));
        let recorder = Recorder(RefCell::new(Vec::new()));
        orchestrator.refresh_and_render(&recorder).await;
        source.fail_snapshot.store(true, Ordering::SeqCst);
        orchestrator.refresh_and_render(&recorder).await;

        let rendered = recorder.0.borrow();
        assert_eq!(rendered[0], (Some(37_000.0), String::new()));
        assert_eq!(rendered[1], (Some(37_000.0), REFRESH_ADVISORY.to_string()));
    }

    #[tokio::test]
    async fn test_failed_pm_gold_keeps_am_quote() {
        let (orchestrator, source, clock) = setup(at(9, 0));
        let day = at(9, 0).date();

        let morning = orchestrator.refresh().await;
        assert_eq!(morning.snapshot.value(IndicatorCode::Oro), Some(70_000.0));

        source.fail_gold.store(true, Ordering::SeqCst);
        clock.set(at(17, 0));
        let afternoon = orchestrator.refresh().await;
        assert_eq!(afternoon.origin, SnapshotOrigin::Fetched);
        assert_eq!(afternoon.snapshot.value(IndicatorCode::Oro), Some(70_000.0));
        assert_eq!(
            orchestrator
                .cache()
                .load_snapshot(day)
                .await
                .and_then(|s| s.value(IndicatorCode::Oro)),
            Some(70_000.0)
        );
        // The pm block stays open for the next cycle.
        assert!(
            orchestrator
                .cache()
                .load_gold_block(day, GoldBlock::Pm)
                .await
                .is_none()
        );

        source.fail_gold.store(false, Ordering::SeqCst);
        clock.set(at(18, 0));
        let retried = orchestrator.refresh().await;
        assert_eq!(retried.snapshot.value(IndicatorCode::Oro), Some(70_002.0));
    }

    #[tokio::test]
    async fn test_storage_notice_joins_advisory() {
        let source = Arc::new(MockSource::new(915.0));
        let orchestrator = RefreshOrchestrator::new(
            source.clone(),
            IndicatorCache::new(Arc::new(MemoryStore::new())),
            Arc::new(FixedClock::new(at(9, 0))),
            QuotaPolicy::default(),
        )
        .with_storage_notice(EPHEMERAL_STORE_ADVISORY);

        let fetched = orchestrator.refresh().await;
        assert_eq!(fetched.advisory, EPHEMERAL_STORE_ADVISORY);

        source.fail_snapshot.store(true, Ordering::SeqCst);
        let failed = orchestrator.refresh().await;
        assert!(failed.advisory.starts_with(REFRESH_ADVISORY));
        assert!(failed.advisory.ends_with(EPHEMERAL_STORE_ADVISORY));
    }
}
