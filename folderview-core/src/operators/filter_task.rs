//! Filter Task: background filter / count computation for a folder view
//!
//! Each submission gets a monotonically increasing generation. Submitting
//! again cancels the in-flight pass (checked between items) and only the
//! current generation may publish, so the notification channel only ever
//! carries monotonically newer results.
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::field::Empty as EmptyTraceField;
use tracing::{Span, debug, instrument, trace, warn};

use crate::controller::actions::Action;
use crate::fs::candidate::{CandidateItem, CandidateList, ItemStatus};
use crate::model::criteria::FilterCriteria;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Status distribution over a candidate list, independent of the text query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Known-deleted items.
    pub deleted: usize,
    pub expected: usize,
    pub normal: usize,
}

impl StatusCounts {
    #[inline]
    pub const fn record(&mut self, status: ItemStatus) {
        match status {
            ItemStatus::Normal => self.normal += 1,
            ItemStatus::Expected => self.expected += 1,
            ItemStatus::KnownDeleted => self.deleted += 1,
            ItemStatus::RemoteDeleted => {}
        }
    }

    #[must_use]
    pub fn tally(items: &CandidateList) -> Self {
        let mut counts = Self::default();
        for item in items {
            counts.record(item.status());
        }
        counts
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.deleted + self.expected + self.normal
    }
}

#[derive(Debug, Clone)]
pub struct FilteredResult {
    pub generation: u64,

    /// Items passing `criteria`, referencing the candidate entries.
    pub items: CandidateList,

    /// `None` until the count task for this generation finished.
    pub counts: Option<StatusCounts>,

    pub criteria: Arc<FilterCriteria>,

    /// Size of the candidate list this result was computed from.
    pub candidate_count: usize,
}

impl FilteredResult {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            generation: 0,
            items: CandidateList::default(),
            counts: Some(StatusCounts::default()),
            criteria: Arc::new(FilterCriteria::default()),
            candidate_count: 0,
        }
    }
}

/// Handle to one submission.
#[derive(Debug, Clone)]
pub struct FilterHandle {
    generation: u64,
    token: CancellationToken,
    immediate: Option<Arc<FilteredResult>>,
}

impl FilterHandle {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Result published synchronously by the no-filter fast path.
    #[must_use]
    pub const fn immediate(&self) -> Option<&Arc<FilteredResult>> {
        self.immediate.as_ref()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

// ============================================================================
// SHARED STATE
// ============================================================================

#[derive(Debug, Default)]
struct EngineState {
    generation: u64,
    cancel: Option<CancellationToken>,
}

struct Shared {
    state: Mutex<EngineState>,
    latest: ArcSwap<FilteredResult>,
    action_tx: UnboundedSender<Action>,
}

impl Shared {
    /// Supersede any in-flight pass and open a new generation.
    fn begin(&self) -> (u64, CancellationToken) {
        let mut state = self.state.lock();

        if let Some(previous) = state.cancel.take() {
            previous.cancel();
        }

        state.generation += 1;
        let token = CancellationToken::new();
        state.cancel = Some(token.clone());

        (state.generation, token)
    }

    // The generation check and the send happen under one lock so a stale
    // pass can never slip in after a newer publish.
    fn publish(&self, result: FilteredResult) -> Option<Arc<FilteredResult>> {
        let state = self.state.lock();

        if state.generation != result.generation {
            debug!(
                marker = "FILTER_SUPERSEDED",
                generation = result.generation,
                current = state.generation,
                "Discarding superseded filter result"
            );
            return None;
        }

        let result = Arc::new(result);
        self.latest.store(Arc::clone(&result));

        if self
            .action_tx
            .send(Action::FilterPublished(Arc::clone(&result)))
            .is_err()
        {
            warn!("Filter result dropped: notification channel closed");
        }

        Some(result)
    }

    fn publish_counts(&self, generation: u64, counts: StatusCounts) -> bool {
        let state = self.state.lock();

        if state.generation != generation {
            trace!(generation, "Discarding superseded counts");
            return false;
        }

        let current: Arc<FilteredResult> = self.latest.load_full();
        if current.generation == generation && current.counts != Some(counts) {
            let mut updated: FilteredResult = (*current).clone();
            updated.counts = Some(counts);
            self.latest.store(Arc::new(updated));
        }

        if self
            .action_tx
            .send(Action::CountsPublished { generation, counts })
            .is_err()
        {
            warn!("Counts dropped: notification channel closed");
        }

        true
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct FilterEngine {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl FilterEngine {
    #[must_use]
    pub fn new(action_tx: UnboundedSender<Action>, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::default()),
                latest: ArcSwap::from_pointee(FilteredResult::empty()),
                action_tx,
            }),
            runtime,
        }
    }

    /// Queue a filter pass. Criteria that filter nothing are answered
    /// synchronously with the candidate list itself; only the counts are
    /// computed in the background.
    #[instrument(
        skip_all,
        fields(
            operation_type = "filter_submit",
            candidates = candidates.len(),
            criteria = %criteria,
            generation = EmptyTraceField,
            fast_path = criteria.is_noop(),
        )
    )]
    pub fn submit(&self, candidates: CandidateList, criteria: Arc<FilterCriteria>) -> FilterHandle {
        let (generation, token) = self.shared.begin();
        Span::current().record("generation", generation);

        if criteria.is_noop() {
            let result = FilteredResult {
                generation,
                candidate_count: candidates.len(),
                items: candidates.clone(),
                counts: None,
                criteria,
            };

            let immediate = self.shared.publish(result);
            self.spawn_count(generation, candidates, token.clone());

            return FilterHandle {
                generation,
                token,
                immediate,
            };
        }

        let shared = Arc::clone(&self.shared);
        let job_token = token.clone();
        self.runtime.spawn_blocking(move || {
            filter_job(&shared, generation, &candidates, criteria, &job_token);
        });

        FilterHandle {
            generation,
            token,
            immediate: None,
        }
    }

    /// Stop the in-flight pass without starting a new one.
    pub fn cancel(&self) {
        if let Some(token) = self.shared.state.lock().cancel.take() {
            token.cancel();
        }
    }

    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.shared.state.lock().generation
    }

    /// Last published result; safe to call from any thread.
    #[must_use]
    pub fn snapshot(&self) -> Arc<FilteredResult> {
        self.shared.latest.load_full()
    }

    fn spawn_count(&self, generation: u64, candidates: CandidateList, token: CancellationToken) {
        let shared = Arc::clone(&self.shared);
        self.runtime.spawn_blocking(move || {
            if let Some(counts) = count_statuses(&candidates, &token) {
                shared.publish_counts(generation, counts);
            }
        });
    }
}

// ============================================================================
// WORKERS
// ============================================================================

#[instrument(
    skip_all,
    fields(
        operation_type = "filter_pass",
        generation = generation,
        candidates = candidates.len(),
        matched = EmptyTraceField,
        elapsed_us = EmptyTraceField,
    )
)]
fn filter_job(
    shared: &Shared,
    generation: u64,
    candidates: &CandidateList,
    criteria: Arc<FilterCriteria>,
    token: &CancellationToken,
) {
    let started = Instant::now();

    let Some((items, counts)) = run_filter(candidates, &criteria, token) else {
        debug!(marker = "FILTER_CANCELLED", generation, "Filter pass cancelled");
        return;
    };

    #[expect(clippy::cast_possible_truncation, reason = "Microseconds fit in u64")]
    let elapsed_us = started.elapsed().as_micros() as u64;

    Span::current()
        .record("matched", items.len())
        .record("elapsed_us", elapsed_us);

    let result = FilteredResult {
        generation,
        candidate_count: candidates.len(),
        items: CandidateList::from_filtered(items),
        counts: Some(counts),
        criteria,
    };

    if shared.publish(result).is_some() {
        shared.publish_counts(generation, counts);
    }
}

/// One pass over `candidates`: collects matches and tallies statuses
/// (before the text filter). `None` when cancelled midway.
#[must_use]
pub fn run_filter(
    candidates: &CandidateList,
    criteria: &FilterCriteria,
    token: &CancellationToken,
) -> Option<(Vec<CandidateItem>, StatusCounts)> {
    let mut items: Vec<CandidateItem> = Vec::with_capacity(candidates.len() / 2);
    let mut counts = StatusCounts::default();

    for item in candidates {
        if token.is_cancelled() {
            return None;
        }

        counts.record(item.status());

        if criteria.matches(item) {
            items.push(item.clone());
        }
    }

    Some((items, counts))
}

/// Cancellable version of [`StatusCounts::tally`].
#[must_use]
pub fn count_statuses(candidates: &CandidateList, token: &CancellationToken) -> Option<StatusCounts> {
    let mut counts = StatusCounts::default();

    for item in candidates {
        if token.is_cancelled() {
            return None;
        }
        counts.record(item.status());
    }

    Some(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::candidate::{DirectoryEntry, FileEntry, FileFlags, Member};
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::time::timeout;

    fn example_list() -> CandidateList {
        CandidateList::from_entries(vec![
            FileEntry::new("f1", "report.txt")
                .with_modified_by(Member::new("a", "alice"))
                .into(),
            FileEntry::new("f1", "photo.jpg")
                .with_modified_by(Member::new("b", "bob"))
                .with_flags(FileFlags {
                    deleted: true,
                    locally_known: true,
                    ..FileFlags::default()
                })
                .into(),
            DirectoryEntry::new(
                "f1",
                "reports",
                vec![FileEntry::new("f1", "reports/q1.txt").into()],
            )
            .into(),
        ])
    }

    fn big_list(n: usize) -> CandidateList {
        CandidateList::from_entries(
            (0..n)
                .map(|i| FileEntry::new("f1", format!("file_{i:06}_{}.dat", i % 7)).into())
                .collect(),
        )
    }

    async fn next_action(rx: &mut UnboundedReceiver<Action>) -> Action {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for engine")
            .expect("channel closed")
    }

    fn names(list: &CandidateList) -> Vec<&str> {
        list.iter().map(CandidateItem::name).collect()
    }

    #[test]
    fn test_run_filter_example() {
        let list = example_list();
        let criteria = FilterCriteria::default()
            .with_text("report")
            .with_show_deleted(false);

        let (items, counts) =
            run_filter(&list, &criteria, &CancellationToken::new()).expect("not cancelled");

        let names: Vec<&str> = items.iter().map(CandidateItem::name).collect();
        assert_eq!(names, vec!["report.txt", "reports"]);
        assert_eq!(
            counts,
            StatusCounts {
                deleted: 1,
                expected: 0,
                normal: 2
            }
        );
    }

    #[test]
    fn test_result_is_subset_and_matches() {
        let list = big_list(500);
        let criteria = FilterCriteria::default().with_text("_3 -0004");

        let (items, _) = run_filter(&list, &criteria, &CancellationToken::new()).expect("ran");

        // file_000045_3.dat and friends carry "_3" but are excluded by "-0004"
        let positive_only = list.iter().filter(|c| c.name().contains("_3")).count();
        assert!(!items.is_empty());
        assert!(items.len() < positive_only, "negation excluded nothing");
        assert!(items.iter().all(|item| !item.name().contains("0004")));

        for item in &items {
            assert!(criteria.matches(item));
            assert!(list.iter().any(|c| c == item));
        }
    }

    #[test]
    fn test_cancelled_run_produces_nothing() {
        let token = CancellationToken::new();
        token.cancel();

        let criteria = FilterCriteria::default().with_text("file");
        assert!(run_filter(&big_list(10), &criteria, &token).is_none());
        assert!(count_statuses(&big_list(10), &token).is_none());
    }

    #[tokio::test]
    async fn test_noop_fast_path_returns_same_list() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = FilterEngine::new(tx, Handle::current());
        let list = example_list();

        let handle = engine.submit(list.clone(), Arc::new(FilterCriteria::default()));

        let immediate = handle.immediate().expect("fast path publishes synchronously");
        assert!(immediate.items.ptr_eq(&list));
        assert!(engine.snapshot().items.ptr_eq(&list));

        match next_action(&mut rx).await {
            Action::FilterPublished(result) => {
                assert_eq!(result.generation, handle.generation());
                assert!(result.items.ptr_eq(&list));
            }
            other => panic!("unexpected action: {other:?}"),
        }

        match next_action(&mut rx).await {
            Action::CountsPublished { generation, counts } => {
                assert_eq!(generation, handle.generation());
                assert_eq!(counts.total(), 3);
            }
            other => panic!("unexpected action: {other:?}"),
        }

        assert_eq!(engine.snapshot().counts.map(|c| c.normal), Some(2));
    }

    #[tokio::test]
    async fn test_background_pass_publishes_result_then_counts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = FilterEngine::new(tx, Handle::current());

        let handle = engine.submit(
            example_list(),
            Arc::new(FilterCriteria::default().with_text("report")),
        );
        assert!(handle.immediate().is_none());

        match next_action(&mut rx).await {
            Action::FilterPublished(result) => {
                assert_eq!(names(&result.items), vec!["report.txt", "reports"]);
                assert_eq!(result.candidate_count, 3);
            }
            other => panic!("unexpected action: {other:?}"),
        }

        assert!(matches!(
            next_action(&mut rx).await,
            Action::CountsPublished { .. }
        ));
    }

    #[tokio::test]
    async fn test_superseded_run_never_publishes_after_newer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = FilterEngine::new(tx, Handle::current());
        let list = big_list(50_000);

        let first = engine.submit(list.clone(), Arc::new(FilterCriteria::default().with_text("_1")));
        let criteria_b = Arc::new(FilterCriteria::default().with_text("_2"));
        let second = engine.submit(list.clone(), Arc::clone(&criteria_b));

        assert!(first.is_cancelled());
        assert!(second.generation() > first.generation());

        let mut published: Vec<u64> = Vec::new();
        loop {
            if let Action::FilterPublished(result) = next_action(&mut rx).await {
                published.push(result.generation);
                if result.generation == second.generation() {
                    let (expected, _) =
                        run_filter(&list, &criteria_b, &CancellationToken::new()).expect("ran");
                    assert_eq!(result.items.as_slice(), expected.as_slice());
                    break;
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        while let Ok(action) = rx.try_recv() {
            if let Action::FilterPublished(result) = action {
                panic!("stale publish after newer result: {}", result.generation);
            }
        }

        assert_eq!(published.last(), Some(&second.generation()));
        assert_eq!(engine.snapshot().generation, second.generation());
    }

    #[tokio::test]
    async fn test_stale_generation_cannot_publish() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let engine = FilterEngine::new(tx, Handle::current());

        let old = engine.submit(example_list(), Arc::new(FilterCriteria::default()));
        let _new = engine.submit(example_list(), Arc::new(FilterCriteria::default()));

        let stale = FilteredResult {
            generation: old.generation(),
            ..FilteredResult::empty()
        };

        assert!(engine.shared.publish(stale).is_none());
        assert!(!engine.shared.publish_counts(old.generation(), StatusCounts::default()));
    }
}
