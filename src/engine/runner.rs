//! Sync loop.
//!
//! `SyncRunner` owns the engine and the poll scheduler on a single task.
//! Store requests run as a pending future polled alongside poll ticks and
//! external events (filter clicks, visibility changes, retries), so events
//! keep being serviced while a fetch is outstanding. A fetch result is
//! applied in one step, so a merge always finishes before the next render
//! or filter change is looked at.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::scheduler::{PollAction, PollScheduler, Visibility};
use super::sync::{EngineState, FixtureSyncEngine};
use crate::types::{Fixture, FixtureError};

/// Capacity of the command channel between the HTTP surface and the loop.
pub const COMMAND_BUFFER: usize = 64;

/// Events delivered to the sync loop.
#[derive(Debug)]
pub enum EngineCommand {
    /// Select a status filter; the reply carries `InvalidFilter` on rejection.
    ApplyFilter {
        filter: String,
        reply: oneshot::Sender<Result<(), FixtureError>>,
    },
    /// The hosting view became visible or hidden.
    Visibility(Visibility),
    /// Re-run initialisation after a failure.
    Retry,
}

/// Cloneable handle for sending events to a running `SyncRunner`.
///
/// Every method fails with `FixtureError::LoopStopped` once the loop has
/// exited.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub async fn apply_filter(&self, filter: &str) -> Result<(), FixtureError> {
        let (reply, rx) = oneshot::channel();
        let cmd = EngineCommand::ApplyFilter { filter: filter.to_string(), reply };
        self.send(cmd).await?;
        rx.await.map_err(|_| FixtureError::LoopStopped)?
    }

    pub async fn set_visibility(&self, visibility: Visibility) -> Result<(), FixtureError> {
        self.send(EngineCommand::Visibility(visibility)).await
    }

    pub async fn retry(&self) -> Result<(), FixtureError> {
        self.send(EngineCommand::Retry).await
    }

    async fn send(&self, cmd: EngineCommand) -> Result<(), FixtureError> {
        self.tx.send(cmd).await.map_err(|e| {
            warn!(command = ?e.0, "Sync loop stopped, command dropped");
            FixtureError::LoopStopped
        })
    }
}

// ---------------------------------------------------------------------------
// In-flight fetches
// ---------------------------------------------------------------------------

/// Result of a store request, tagged with what asked for it.
enum FetchOutcome {
    Snapshot(Result<Vec<Fixture>, FixtureError>),
    Live(Result<Vec<Fixture>, FixtureError>),
}

type FetchFuture = Pin<Box<dyn Future<Output = FetchOutcome> + Send>>;

/// Resolve the in-flight fetch, or pend forever when there is none.
async fn next_outcome(slot: &mut Option<FetchFuture>) -> FetchOutcome {
    match slot.as_mut() {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct SyncRunner {
    engine: FixtureSyncEngine,
    scheduler: PollScheduler,
    commands: mpsc::Receiver<EngineCommand>,
    /// At most one store request is outstanding.
    in_flight: Option<FetchFuture>,
}

impl SyncRunner {
    /// Create a runner and the handle used to drive it.
    pub fn new(engine: FixtureSyncEngine, scheduler: PollScheduler) -> (Self, EngineHandle) {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        (
            Self { engine, scheduler, commands, in_flight: None },
            EngineHandle { tx },
        )
    }

    pub fn engine(&self) -> &FixtureSyncEngine {
        &self.engine
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Initialise, then service fetches, ticks and commands until
    /// `shutdown` resolves or every handle is dropped. Returns the engine.
    ///
    /// A fetch still outstanding at shutdown is dropped.
    pub async fn run<F>(mut self, shutdown: F) -> FixtureSyncEngine
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.start_initialize();

        info!(
            category = %self.engine.category(),
            interval_secs = self.scheduler.period().as_secs(),
            "Entering sync loop"
        );

        loop {
            tokio::select! {
                outcome = next_outcome(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.complete(outcome);
                }
                _ = self.scheduler.tick() => {
                    self.start_live_poll();
                }
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => {
                        info!("All engine handles dropped, leaving sync loop");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown signal received, leaving sync loop");
                    break;
                }
            }
        }

        self.scheduler.disarm();
        self.engine
    }

    /// Handle one command. Never waits on the store.
    pub fn handle(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::ApplyFilter { filter, reply } => {
                let result = self.engine.apply_filter(&filter);
                if let Err(e) = &result {
                    warn!(error = %e, "Filter rejected");
                }
                // The requester may have gone away; nothing to do then.
                let _ = reply.send(result);
            }
            EngineCommand::Visibility(visibility) => {
                if self.scheduler.on_visibility(visibility) == PollAction::RefreshNow {
                    self.start_live_poll();
                }
            }
            EngineCommand::Retry => match self.engine.state() {
                EngineState::Ready => info!("Retry ignored, fixtures already loaded"),
                EngineState::Loading => info!("Retry ignored, fixture fetch in flight"),
                EngineState::Idle | EngineState::Failed => self.start_initialize(),
            },
        }
    }

    fn start_initialize(&mut self) {
        let category = self.engine.category();
        self.engine.begin_initialize(category);
        let store = self.engine.store();
        self.in_flight = Some(Box::pin(async move {
            FetchOutcome::Snapshot(store.fetch_fixtures(category).await)
        }));
    }

    fn start_live_poll(&mut self) {
        if self.in_flight.is_some() {
            debug!("Previous fetch still in flight, skipping live poll");
            return;
        }
        let store = self.engine.store();
        self.in_flight = Some(Box::pin(async move {
            FetchOutcome::Live(store.fetch_live().await)
        }));
    }

    fn complete(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Snapshot(result) => match self.engine.complete_initialize(result) {
                Ok(()) => self.scheduler.arm(),
                Err(e) => {
                    warn!(error = %e, "Initialisation failed, polling not started");
                    self.scheduler.disarm();
                }
            },
            FetchOutcome::Live(result) => match self.engine.apply_live(result) {
                Ok(report) if report.applied > 0 => {
                    info!(applied = report.applied, ignored = report.ignored, "Live scores updated");
                }
                Ok(_) => {}
                // Already logged by the engine; the next tick tries again.
                Err(_) => {}
            },
        }
    }
}
