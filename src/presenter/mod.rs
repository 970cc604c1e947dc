//! Presenter integrations.
//!
//! A presenter is the rendering surface for the sync engine. It receives
//! owned, read-only snapshots of the computed view; nothing it holds can
//! reach back into the engine's cache.

use tokio::sync::watch;
use tracing::debug;

use crate::types::{ErrorView, FixtureView, PresentedView};

/// Rendering surface consumed by the sync engine.
pub trait Presenter: Send + Sync {
    /// Show the in-flight state of a full fetch.
    fn show_loading(&self);

    /// Show grouped fixtures together with the filter control state.
    fn show_fixtures(&self, view: FixtureView);

    /// Show a terminal initialisation failure.
    fn show_error(&self, error: ErrorView);
}

/// Publishes the latest view on a `watch` channel.
///
/// Readers (the dashboard) always see the most recent complete view.
pub struct WatchPresenter {
    tx: watch::Sender<PresentedView>,
}

impl WatchPresenter {
    /// Create a presenter and the receiver half readers subscribe through.
    pub fn channel() -> (Self, watch::Receiver<PresentedView>) {
        let (tx, rx) = watch::channel(PresentedView::Loading);
        (Self { tx }, rx)
    }

    fn publish(&self, view: PresentedView) {
        // send_replace never fails, even with no live receivers.
        self.tx.send_replace(view);
    }
}

impl Presenter for WatchPresenter {
    fn show_loading(&self) {
        self.publish(PresentedView::Loading);
    }

    fn show_fixtures(&self, view: FixtureView) {
        debug!(
            groups = view.groups.len(),
            filter = %view.active_filter,
            "Publishing fixture view"
        );
        self.publish(PresentedView::Fixtures(view));
    }

    fn show_error(&self, error: ErrorView) {
        debug!(message = %error.message, "Publishing error view");
        self.publish(PresentedView::Error(error));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
