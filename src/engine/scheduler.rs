//! Visibility-aware poll scheduler.
//!
//! A two-state machine, `Polling` or `Suspended`. The poll timer exists
//! only while polling; hiding the view drops it, and showing the view
//! again asks for one immediate refresh before the interval resumes.
//! Entering `Polling` from `Polling` is a no-op, so at most one timer is
//! ever live.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Visibility of the hosting view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl From<bool> for Visibility {
    fn from(visible: bool) -> Self {
        if visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Suspended,
}

/// What the caller should do after a visibility transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Run one live refresh now.
    RefreshNow,
    Nothing,
}

pub struct PollScheduler {
    period: Duration,
    visibility: Visibility,
    /// Set once the engine has a cache worth refreshing.
    armed: bool,
    timer: Option<Interval>,
}

impl PollScheduler {
    pub fn new(period: Duration, initial: Visibility) -> Self {
        Self {
            period,
            visibility: initial,
            armed: false,
            timer: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn state(&self) -> PollState {
        if self.timer.is_some() {
            PollState::Polling
        } else {
            PollState::Suspended
        }
    }

    /// Allow polling after a successful initialisation. The cache is fresh,
    /// so the first tick lands one full period from now.
    pub fn arm(&mut self) {
        self.armed = true;
        if self.visibility == Visibility::Visible {
            self.start_timer();
        }
    }

    /// Stop polling until `arm` is called again.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.timer = None;
    }

    /// Apply a visibility transition.
    pub fn on_visibility(&mut self, visibility: Visibility) -> PollAction {
        self.visibility = visibility;
        match visibility {
            Visibility::Hidden => {
                if self.timer.take().is_some() {
                    debug!("View hidden, poll timer suspended");
                }
                PollAction::Nothing
            }
            Visibility::Visible => {
                if !self.armed || self.timer.is_some() {
                    return PollAction::Nothing;
                }
                debug!("View visible, resuming polling");
                self.start_timer();
                PollAction::RefreshNow
            }
        }
    }

    /// Wait for the next poll tick. Pends forever while suspended.
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    fn start_timer(&mut self) {
        if self.timer.is_some() {
            return;
        }
        let mut timer = interval_at(Instant::now() + self.period, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
