//! In-memory fixture store for integration testing.
//!
//! Provides a deterministic `FixtureStore` whose snapshot, live feed and
//! failure modes are controllable from test code after it has been handed
//! to an engine, plus a few fixture builders.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fixture_sync::store::FixtureStore;
use fixture_sync::types::*;

#[derive(Default)]
struct Inner {
    snapshot: Vec<Fixture>,
    live: Vec<Fixture>,
    fail_fetch: bool,
    fail_live: bool,
    fetch_delay: Duration,
    live_delay: Duration,
    fetch_calls: usize,
    live_calls: usize,
}

/// A fixture store backed by shared in-memory state.
///
/// Clones share state, so a test keeps one clone for control and gives
/// another to the engine.
#[derive(Clone, Default)]
pub struct MockStore {
    inner: Arc<Mutex<Inner>>,
}

impl MockStore {
    pub fn with_snapshot(snapshot: Vec<Fixture>) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().snapshot = snapshot;
        store
    }

    pub fn set_live(&self, live: Vec<Fixture>) {
        self.inner.lock().unwrap().live = live;
    }

    /// Make subsequent full fetches fail (or succeed again).
    pub fn set_fetch_error(&self, fail: bool) {
        self.inner.lock().unwrap().fail_fetch = fail;
    }

    /// Make subsequent live polls fail (or succeed again).
    pub fn set_live_error(&self, fail: bool) {
        self.inner.lock().unwrap().fail_live = fail;
    }

    /// Hold every full fetch for `delay` before answering.
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().fetch_delay = delay;
    }

    /// Hold every live poll for `delay` before answering.
    pub fn set_live_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().live_delay = delay;
    }

    pub fn fetch_calls(&self) -> usize {
        self.inner.lock().unwrap().fetch_calls
    }

    pub fn live_calls(&self) -> usize {
        self.inner.lock().unwrap().live_calls
    }
}

#[async_trait]
impl FixtureStore for MockStore {
    async fn fetch_fixtures(&self, category: Category) -> Result<Vec<Fixture>, FixtureError> {
        let (delay, result) = {
            let mut inner = self.inner.lock().unwrap();
            inner.fetch_calls += 1;
            let result = if inner.fail_fetch {
                Err(FixtureError::Fetch {
                    category,
                    message: "connection refused".into(),
                })
            } else {
                Ok(inner.snapshot.clone())
            };
            (inner.fetch_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn fetch_live(&self) -> Result<Vec<Fixture>, FixtureError> {
        let (delay, result) = {
            let mut inner = self.inner.lock().unwrap();
            inner.live_calls += 1;
            let result = if inner.fail_live {
                Err(FixtureError::LivePoll("503 Service Unavailable".into()))
            } else {
                Ok(inner.live.clone())
            };
            (inner.live_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn team(name: &str) -> Option<TeamSummary> {
    Some(TeamSummary {
        name: name.to_string(),
        crest_url: None,
    })
}

pub fn fixture(id: &str, status: FixtureStatus, kickoff: &str) -> Fixture {
    Fixture {
        id: id.to_string(),
        category: None,
        status,
        match_date: at(kickoff),
        home_team: team(&format!("Home {id}")),
        away_team: team(&format!("Away {id}")),
        home_score: 0,
        away_score: 0,
        minute: 0,
        venue: Some("Pitch 1".into()),
        time: None,
        scheduled_time: None,
    }
}

/// A live update for fixture `id` with the given score and minute.
pub fn live_update(base: &Fixture, home: u32, away: u32, minute: u32) -> Fixture {
    Fixture {
        status: FixtureStatus::Live,
        home_score: home,
        away_score: away,
        minute,
        ..base.clone()
    }
}

/// Five fixtures over three days, deliberately out of date order.
pub fn tournament() -> Vec<Fixture> {
    vec![
        fixture("f3", FixtureStatus::Upcoming, "2025-06-15T09:00:00Z"),
        fixture("f1", FixtureStatus::Completed, "2025-06-14T09:00:00Z"),
        fixture("f2", FixtureStatus::Live, "2025-06-14T11:00:00Z"),
        fixture("f5", FixtureStatus::Upcoming, "2025-06-16T14:30:00Z"),
        fixture("f4", FixtureStatus::Upcoming, "2025-06-15T13:00:00Z"),
    ]
}
