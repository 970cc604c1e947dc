//! Fixture store integrations.
//!
//! Defines the `FixtureStore` trait and provides the HTTP implementation
//! that reads the static per-category snapshot and the live-update feed.

pub mod http;

use async_trait::async_trait;

use crate::types::{Category, Fixture, FixtureError};

/// Read-only source of fixture data.
///
/// `fetch_fixtures` returns the full snapshot for one category and fails
/// with `FixtureError::Fetch`; `fetch_live` returns the sparse list of
/// fixtures currently in progress and fails with `FixtureError::LivePoll`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FixtureStore: Send + Sync {
    /// Fetch the full fixture list for `category`, in store order.
    async fn fetch_fixtures(&self, category: Category) -> Result<Vec<Fixture>, FixtureError>;

    /// Fetch live updates for in-progress matches across all categories.
    async fn fetch_live(&self) -> Result<Vec<Fixture>, FixtureError>;
}
