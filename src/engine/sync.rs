//! Fixture sync engine.
//!
//! Owns the cached fixture list for one category, merges live updates into
//! it by id, tracks the active status filter, and hands rendered views to
//! the presenter after every successful fetch or filter change.

use chrono::FixedOffset;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::render;
use crate::presenter::Presenter;
use crate::store::FixtureStore;
use crate::types::{Category, ErrorView, Fixture, FixtureError, FixtureView, StatusFilter};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of the engine's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No initialisation attempted yet.
    Idle,
    /// A full fetch is in flight.
    Loading,
    /// Cache populated; live merges and renders are active.
    Ready,
    /// The last initialisation failed; waiting for a retry.
    Failed,
}

/// Outcome of one live merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Updates in the live response.
    pub received: usize,
    /// Cached fixtures replaced.
    pub applied: usize,
    /// Updates dropped for unknown ids or a foreign category.
    pub ignored: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// In-memory, periodically refreshed fixture cache for one category.
pub struct FixtureSyncEngine {
    store: Arc<dyn FixtureStore>,
    presenter: Box<dyn Presenter>,
    event_offset: FixedOffset,
    category: Category,
    state: EngineState,
    /// Store order from the last full fetch.
    fixtures: Vec<Fixture>,
    /// id → position in `fixtures`.
    index: HashMap<String, usize>,
    filter: StatusFilter,
}

impl FixtureSyncEngine {
    /// Create an engine for `category` with injected collaborators.
    ///
    /// Nothing is fetched until `initialize` is called.
    pub fn new(
        store: Box<dyn FixtureStore>,
        presenter: Box<dyn Presenter>,
        category: Category,
        event_offset: FixedOffset,
    ) -> Self {
        Self {
            store: Arc::from(store),
            presenter,
            event_offset,
            category,
            state: EngineState::Idle,
            fixtures: Vec::new(),
            index: HashMap::new(),
            filter: StatusFilter::All,
        }
    }

    // -- Accessors -------------------------------------------------------

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    pub fn current_filter(&self) -> StatusFilter {
        self.filter
    }

    /// Read-only view of the cache, in store order.
    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn fixture(&self, id: &str) -> Option<&Fixture> {
        self.index.get(id).map(|&i| &self.fixtures[i])
    }

    /// Shared handle to the store, for fetches driven outside the engine.
    pub fn store(&self) -> Arc<dyn FixtureStore> {
        Arc::clone(&self.store)
    }

    // -- Operations ------------------------------------------------------

    /// Fetch the full fixture list for `category` and render it.
    ///
    /// On failure the presenter shows a retryable error and the previous
    /// cache is left as it was.
    pub async fn initialize(&mut self, category: Category) -> Result<(), FixtureError> {
        self.begin_initialize(category);
        let result = self.store.fetch_fixtures(category).await;
        self.complete_initialize(result)
    }

    /// First half of `initialize`: enter `Loading` and show it.
    pub fn begin_initialize(&mut self, category: Category) {
        self.category = category;
        self.state = EngineState::Loading;
        self.presenter.show_loading();
        info!(category = %category, "Fetching fixture snapshot");
    }

    /// Second half of `initialize`: apply the outcome of the full fetch.
    pub fn complete_initialize(
        &mut self,
        result: Result<Vec<Fixture>, FixtureError>,
    ) -> Result<(), FixtureError> {
        let category = self.category;
        match result {
            Ok(snapshot) => {
                self.load_snapshot(snapshot);
                self.state = EngineState::Ready;
                info!(category = %category, count = self.fixtures.len(), "Fixture cache initialised");
                self.render();
                Ok(())
            }
            Err(e) => {
                error!(category = %category, error = %e, "Fixture snapshot fetch failed");
                self.state = EngineState::Failed;
                self.presenter.show_error(ErrorView {
                    message: format!("Couldn't load {category} fixtures. Please try again."),
                    retryable: true,
                });
                Err(match e {
                    FixtureError::Fetch { .. } => e,
                    other => FixtureError::Fetch { category, message: other.to_string() },
                })
            }
        }
    }

    /// Select the status filter and re-render from cache. Never fetches.
    pub fn apply_filter(&mut self, filter: &str) -> Result<(), FixtureError> {
        let filter: StatusFilter = filter.parse()?;
        self.set_filter(filter);
        Ok(())
    }

    /// Typed form of `apply_filter`.
    pub fn set_filter(&mut self, filter: StatusFilter) {
        debug!(filter = %filter, "Filter applied");
        self.filter = filter;
        if self.is_ready() {
            self.render();
        }
    }

    /// Fetch live updates and merge them into the cache by id.
    ///
    /// A transport failure leaves the cache and filter untouched and is
    /// returned as `LivePoll`; callers log it and keep polling.
    pub async fn refresh_live(&mut self) -> Result<MergeReport, FixtureError> {
        let result = self.store.fetch_live().await;
        self.apply_live(result)
    }

    /// Apply the outcome of a live fetch: merge, then render if anything
    /// changed.
    pub fn apply_live(
        &mut self,
        result: Result<Vec<Fixture>, FixtureError>,
    ) -> Result<MergeReport, FixtureError> {
        let updates = match result {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "Live poll failed, keeping cached fixtures");
                return Err(match e {
                    FixtureError::LivePoll(_) => e,
                    other => FixtureError::LivePoll(other.to_string()),
                });
            }
        };

        let report = self.merge_live(updates);
        debug!(
            received = report.received,
            applied = report.applied,
            ignored = report.ignored,
            "Live updates merged"
        );

        // Merge completes before any render sees the list.
        if report.applied > 0 && self.is_ready() {
            self.render();
        }
        Ok(report)
    }

    /// Replace cached fixtures matching each update's id.
    ///
    /// Unknown ids and updates tagged with another category are dropped;
    /// the cache never grows or shrinks here.
    pub fn merge_live(&mut self, updates: Vec<Fixture>) -> MergeReport {
        let mut report = MergeReport {
            received: updates.len(),
            ..MergeReport::default()
        };

        for mut update in updates {
            if update.category.is_some_and(|c| c != self.category) {
                report.ignored += 1;
                continue;
            }
            let Some(&pos) = self.index.get(&update.id) else {
                debug!(id = %update.id, "Live update for unknown fixture ignored");
                report.ignored += 1;
                continue;
            };
            update.category = Some(self.category);
            self.fixtures[pos] = update;
            report.applied += 1;
        }

        report
    }

    /// Compute the current view without presenting it.
    pub fn view(&self) -> FixtureView {
        render::build_view(&self.fixtures, self.category, self.filter, self.event_offset)
    }

    // -- Internals -------------------------------------------------------

    fn render(&self) {
        self.presenter.show_fixtures(self.view());
    }

    /// Replace the cache with a fresh snapshot, first occurrence per id wins.
    fn load_snapshot(&mut self, snapshot: Vec<Fixture>) {
        let mut fixtures = Vec::with_capacity(snapshot.len());
        let mut index = HashMap::with_capacity(snapshot.len());

        for mut fixture in snapshot {
            if index.contains_key(&fixture.id) {
                warn!(id = %fixture.id, "Duplicate fixture id in snapshot, keeping first");
                continue;
            }
            fixture.category = Some(self.category);
            index.insert(fixture.id.clone(), fixtures.len());
            fixtures.push(fixture);
        }

        self.fixtures = fixtures;
        self.index = index;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockFixtureStore;
    use crate::types::{FixtureStatus, PresentedView, TeamSummary};
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};
    use tokio_test::{assert_err, assert_ok};

    /// Presenter that records every view it is handed.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<PresentedView>>>);

    impl Recorder {
        fn views(&self) -> Vec<PresentedView> {
            self.0.lock().unwrap().clone()
        }

        fn last(&self) -> Option<PresentedView> {
            self.0.lock().unwrap().last().cloned()
        }
    }

    impl Presenter for Recorder {
        fn show_loading(&self) {
            self.0.lock().unwrap().push(PresentedView::Loading);
        }
        fn show_fixtures(&self, view: FixtureView) {
            self.0.lock().unwrap().push(PresentedView::Fixtures(view));
        }
        fn show_error(&self, error: ErrorView) {
            self.0.lock().unwrap().push(PresentedView::Error(error));
        }
    }

    fn fixture(id: &str, status: FixtureStatus, hour: u32) -> Fixture {
        Fixture {
            id: id.to_string(),
            category: None,
            status,
            match_date: Utc.with_ymd_and_hms(2025, 6, 14, hour, 0, 0).unwrap(),
            home_team: Some(TeamSummary { name: "Harbour FC".into(), crest_url: None }),
            away_team: None,
            home_score: 0,
            away_score: 0,
            minute: 0,
            venue: Some("Pitch 1".into()),
            time: None,
            scheduled_time: None,
        }
    }

    fn snapshot() -> Vec<Fixture> {
        let mut done = fixture("3", FixtureStatus::Completed, 9);
        done.home_score = 2;
        vec![
            fixture("5", FixtureStatus::Upcoming, 14),
            fixture("4", FixtureStatus::Live, 12),
            done,
        ]
    }

    fn engine_with(store: MockFixtureStore) -> (FixtureSyncEngine, Recorder) {
        let recorder = Recorder::default();
        let engine = FixtureSyncEngine::new(
            Box::new(store),
            Box::new(recorder.clone()),
            Category::U17,
            FixedOffset::east_opt(0).unwrap(),
        );
        (engine, recorder)
    }

    async fn ready_engine(live: Vec<Fixture>) -> (FixtureSyncEngine, Recorder) {
        let mut store = MockFixtureStore::new();
        store.expect_fetch_fixtures().returning(|_| Ok(snapshot()));
        store.expect_fetch_live().returning(move || Ok(live.clone()));
        let (mut engine, recorder) = engine_with(store);
        engine.initialize(Category::U17).await.unwrap();
        (engine, recorder)
    }

    // -- initialize --

    #[tokio::test]
    async fn test_initialize_success_renders() {
        let (engine, recorder) = ready_engine(Vec::new()).await;
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.fixtures().len(), 3);
        assert!(engine.fixtures().iter().all(|f| f.category == Some(Category::U17)));

        let views = recorder.views();
        assert_eq!(views[0], PresentedView::Loading);
        assert!(matches!(views.last(), Some(PresentedView::Fixtures(_))));
    }

    #[tokio::test]
    async fn test_initialize_keeps_store_order() {
        let (engine, _) = ready_engine(Vec::new()).await;
        let ids: Vec<&str> = engine.fixtures().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["5", "4", "3"]);
    }

    #[tokio::test]
    async fn test_initialize_failure_shows_retry() {
        let mut store = MockFixtureStore::new();
        store.expect_fetch_fixtures().returning(|category| {
            Err(FixtureError::Fetch { category, message: "connection refused".into() })
        });
        store.expect_fetch_live().never();
        let (mut engine, recorder) = engine_with(store);

        let err = assert_err!(engine.initialize(Category::U17).await);
        assert!(matches!(err, FixtureError::Fetch { category: Category::U17, .. }));
        assert_eq!(engine.state(), EngineState::Failed);
        match recorder.last() {
            Some(PresentedView::Error(e)) => {
                assert!(e.retryable);
                assert!(e.message.contains("u17"));
            }
            other => panic!("expected error view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_initialize_dedups_snapshot_ids() {
        let mut store = MockFixtureStore::new();
        store.expect_fetch_fixtures().returning(|_| {
            let mut dup = fixture("5", FixtureStatus::Completed, 20);
            dup.home_score = 9;
            Ok(vec![fixture("5", FixtureStatus::Upcoming, 14), dup])
        });
        let (mut engine, _) = engine_with(store);
        assert_ok!(engine.initialize(Category::U17).await);
        assert_eq!(engine.fixtures().len(), 1);
        assert_eq!(engine.fixture("5").unwrap().status, FixtureStatus::Upcoming);
    }

    #[test]
    fn test_split_initialize_loading_until_complete() {
        let (mut engine, recorder) = engine_with(MockFixtureStore::new());

        engine.begin_initialize(Category::U17);
        assert_eq!(engine.state(), EngineState::Loading);
        assert_eq!(recorder.last(), Some(PresentedView::Loading));

        engine.apply_filter("completed").unwrap();
        assert_eq!(recorder.views().len(), 1, "no render while loading");

        assert_ok!(engine.complete_initialize(Ok(snapshot())));
        assert!(engine.is_ready());
        match recorder.last() {
            Some(PresentedView::Fixtures(view)) => {
                assert_eq!(view.active_filter, StatusFilter::Completed);
                assert_eq!(view.groups[0].fixtures[0].id, "3");
            }
            other => panic!("expected fixtures view, got {other:?}"),
        }
    }

    #[test]
    fn test_complete_initialize_wraps_foreign_error() {
        let (mut engine, recorder) = engine_with(MockFixtureStore::new());
        engine.begin_initialize(Category::OpenAge);

        let err = assert_err!(engine.complete_initialize(Err(FixtureError::LivePoll("reset".into()))));
        assert!(matches!(err, FixtureError::Fetch { category: Category::OpenAge, .. }));
        assert_eq!(engine.state(), EngineState::Failed);
        assert!(matches!(recorder.last(), Some(PresentedView::Error(_))));
    }

    // -- apply_filter --

    #[tokio::test]
    async fn test_apply_filter_renders_without_fetch() {
        let mut store = MockFixtureStore::new();
        store.expect_fetch_fixtures().times(1).returning(|_| Ok(snapshot()));
        store.expect_fetch_live().never();
        let (mut engine, recorder) = engine_with(store);
        engine.initialize(Category::U17).await.unwrap();

        assert_ok!(engine.apply_filter("completed"));
        assert_eq!(engine.current_filter(), StatusFilter::Completed);
        match recorder.last() {
            Some(PresentedView::Fixtures(view)) => {
                assert_eq!(view.active_filter, StatusFilter::Completed);
                assert_eq!(view.groups.len(), 1);
                assert_eq!(view.groups[0].fixtures[0].id, "3");
            }
            other => panic!("expected fixtures view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_apply_filter_rejects_unknown() {
        let (mut engine, recorder) = ready_engine(Vec::new()).await;
        let before = recorder.views().len();

        let err = assert_err!(engine.apply_filter("postponed"));
        assert!(matches!(err, FixtureError::InvalidFilter(_)));
        assert_eq!(engine.current_filter(), StatusFilter::All);
        assert_eq!(recorder.views().len(), before, "rejected filter must not render");
    }

    #[tokio::test]
    async fn test_filter_idempotent() {
        let (mut engine, recorder) = ready_engine(Vec::new()).await;

        engine.apply_filter("completed").unwrap();
        let once = recorder.last();
        engine.apply_filter("all").unwrap();
        engine.apply_filter("completed").unwrap();
        assert_eq!(recorder.last(), once);
    }

    #[tokio::test]
    async fn test_filter_before_ready_is_remembered() {
        let mut store = MockFixtureStore::new();
        store.expect_fetch_fixtures().returning(|_| Ok(snapshot()));
        let (mut engine, recorder) = engine_with(store);

        engine.apply_filter("live").unwrap();
        assert!(recorder.views().is_empty());

        engine.initialize(Category::U17).await.unwrap();
        match recorder.last() {
            Some(PresentedView::Fixtures(view)) => {
                assert_eq!(view.active_filter, StatusFilter::Live);
                assert_eq!(view.groups[0].fixtures[0].id, "4");
            }
            other => panic!("expected fixtures view, got {other:?}"),
        }
    }

    // -- refresh_live / merge --

    #[tokio::test]
    async fn test_live_update_replaces_in_place() {
        let mut update = fixture("5", FixtureStatus::Live, 14);
        update.minute = 12;
        let (mut engine, _) = ready_engine(vec![update]).await;

        let report = engine.refresh_live().await.unwrap();
        assert_eq!(report, MergeReport { received: 1, applied: 1, ignored: 0 });

        let merged: Vec<&Fixture> = engine.fixtures().iter().filter(|f| f.id == "5").collect();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, FixtureStatus::Live);
        assert_eq!(merged[0].minute, 12);
        assert_eq!(engine.fixtures()[0].id, "5", "position preserved");
    }

    #[tokio::test]
    async fn test_unknown_id_ignored() {
        let (mut engine, _) = ready_engine(vec![fixture("999", FixtureStatus::Live, 10)]).await;
        let before = engine.fixtures().to_vec();

        let report = engine.refresh_live().await.unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.ignored, 1);
        assert_eq!(engine.fixtures(), before.as_slice());
    }

    #[tokio::test]
    async fn test_foreign_category_update_ignored() {
        let mut update = fixture("4", FixtureStatus::Completed, 12);
        update.category = Some(Category::OpenAge);
        let (mut engine, _) = ready_engine(vec![update]).await;

        let report = engine.refresh_live().await.unwrap();
        assert_eq!(report.ignored, 1);
        assert_eq!(engine.fixture("4").unwrap().status, FixtureStatus::Live);
    }

    #[tokio::test]
    async fn test_absent_fixtures_untouched() {
        let mut update = fixture("4", FixtureStatus::Live, 12);
        update.minute = 55;
        let (mut engine, _) = ready_engine(vec![update]).await;
        let completed_before = engine.fixture("3").cloned();

        engine.refresh_live().await.unwrap();
        assert_eq!(engine.fixture("3").cloned(), completed_before);
        assert_eq!(engine.fixture("5").unwrap().status, FixtureStatus::Upcoming);
        assert_eq!(engine.fixture("4").unwrap().minute, 55);
    }

    #[tokio::test]
    async fn test_repeated_polls_keep_count() {
        let updates = vec![
            fixture("5", FixtureStatus::Live, 14),
            fixture("999", FixtureStatus::Live, 14),
            fixture("4", FixtureStatus::Completed, 12),
        ];
        let (mut engine, _) = ready_engine(updates).await;
        for _ in 0..5 {
            engine.refresh_live().await.unwrap();
            assert_eq!(engine.fixtures().len(), 3);
        }
    }

    #[tokio::test]
    async fn test_live_failure_keeps_state() {
        let mut store = MockFixtureStore::new();
        store.expect_fetch_fixtures().returning(|_| Ok(snapshot()));
        store
            .expect_fetch_live()
            .returning(|| Err(FixtureError::LivePoll("503 Service Unavailable".into())));
        let (mut engine, recorder) = engine_with(store);
        engine.initialize(Category::U17).await.unwrap();
        engine.apply_filter("upcoming").unwrap();
        let before = engine.fixtures().to_vec();
        let views_before = recorder.views().len();

        let err = assert_err!(engine.refresh_live().await);
        assert!(matches!(err, FixtureError::LivePoll(_)));
        assert_eq!(engine.fixtures(), before.as_slice());
        assert_eq!(engine.current_filter(), StatusFilter::Upcoming);
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(recorder.views().len(), views_before);
    }

    #[tokio::test]
    async fn test_merge_renders_full_update() {
        let mut update = fixture("5", FixtureStatus::Live, 14);
        update.home_score = 1;
        update.minute = 3;
        let (mut engine, recorder) = ready_engine(vec![update]).await;
        engine.apply_filter("live").unwrap();

        engine.refresh_live().await.unwrap();
        match recorder.last() {
            Some(PresentedView::Fixtures(view)) => {
                let ids: Vec<&str> = view.groups[0].fixtures.iter().map(|f| f.id.as_str()).collect();
                assert_eq!(ids, vec!["4", "5"]);
                assert_eq!(view.groups[0].fixtures[1].headline, "1 - 0 (3')");
            }
            other => panic!("expected fixtures view, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_live_merges_and_renders() {
        let (mut engine, recorder) = engine_with(MockFixtureStore::new());
        engine.begin_initialize(Category::U17);
        engine.complete_initialize(Ok(snapshot())).unwrap();
        let views_before = recorder.views().len();

        let mut update = fixture("4", FixtureStatus::Live, 12);
        update.away_score = 3;
        let report = assert_ok!(engine.apply_live(Ok(vec![update])));
        assert_eq!(report.applied, 1);
        assert_eq!(recorder.views().len(), views_before + 1);

        let err = assert_err!(engine.apply_live(Err(FixtureError::UnknownCategory("x".into()))));
        assert!(matches!(err, FixtureError::LivePoll(_)));
        assert_eq!(engine.fixture("4").unwrap().away_score, 3);
    }

    #[test]
    fn test_merge_live_without_snapshot_is_noop() {
        let (mut engine, _) = engine_with(MockFixtureStore::new());
        let report = engine.merge_live(vec![fixture("1", FixtureStatus::Live, 10)]);
        assert_eq!(report.applied, 0);
        assert!(engine.fixtures().is_empty());
    }
}
