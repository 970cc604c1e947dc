//! HTTP fixture store.
//!
//! Endpoints (relative to the configured base URL):
//! - `GET /assets/data/{category}/fixtures.json` → `{ "fixtures": [...] }`
//! - `GET /api/tournament/live-fixtures` → `[...]`

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::FixtureStore;
use crate::types::{Category, Fixture, FixtureError, FixtureSnapshot};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const LIVE_FIXTURES_PATH: &str = "/api/tournament/live-fixtures";

const DEFAULT_USER_AGENT: &str = "fixture-sync/0.1.0";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Fixture store backed by the tournament site's HTTP endpoints.
pub struct HttpFixtureStore {
    http: Client,
    base_url: String,
}

impl HttpFixtureStore {
    /// Create a new store client.
    ///
    /// `timeout` bounds every request, so a stalled full fetch surfaces as
    /// a `Fetch` error instead of leaving initialisation pending.
    pub fn new(base_url: &str, timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()
            .context("Failed to build HTTP client for fixture store")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fixtures_url(&self, category: Category) -> String {
        format!(
            "{}/assets/data/{}/fixtures.json",
            self.base_url,
            urlencoding::encode(category.as_str())
        )
    }

    fn live_url(&self) -> String {
        format!("{}{LIVE_FIXTURES_PATH}", self.base_url)
    }

    /// GET `url` and decode a JSON body, mapping any failure to a message.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        debug!(url = %url, "Fetching");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("{url} returned {status}: {body}"));
        }

        resp.json::<T>()
            .await
            .map_err(|e| format!("failed to parse response from {url}: {e}"))
    }
}

// ---------------------------------------------------------------------------
// FixtureStore trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl FixtureStore for HttpFixtureStore {
    async fn fetch_fixtures(&self, category: Category) -> Result<Vec<Fixture>, FixtureError> {
        let url = self.fixtures_url(category);
        let snapshot: FixtureSnapshot = self
            .get_json(&url)
            .await
            .map_err(|message| FixtureError::Fetch { category, message })?;

        debug!(category = %category, count = snapshot.fixtures.len(), "Fixture snapshot fetched");
        Ok(snapshot.fixtures)
    }

    async fn fetch_live(&self) -> Result<Vec<Fixture>, FixtureError> {
        let url = self.live_url();
        let updates: Vec<Fixture> = self.get_json(&url).await.map_err(FixtureError::LivePoll)?;

        debug!(count = updates.len(), "Live updates fetched");
        Ok(updates)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
