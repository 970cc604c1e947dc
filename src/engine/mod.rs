//! Core engine: fixture cache, rendering, and the visibility-aware poll loop.

pub mod render;
pub mod runner;
pub mod scheduler;
pub mod sync;

pub use runner::{EngineCommand, EngineHandle, SyncRunner};
pub use scheduler::{PollAction, PollScheduler, PollState, Visibility};
pub use sync::{EngineState, FixtureSyncEngine, MergeReport};
