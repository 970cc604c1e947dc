//! fixture-sync — live tournament fixture board.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the fixture store, presenter and sync loop together, starts the
//! dashboard and runs until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use fixture_sync::config;
use fixture_sync::dashboard::{self, routes::DashboardState};
use fixture_sync::engine::{FixtureSyncEngine, PollScheduler, SyncRunner};
use fixture_sync::presenter::WatchPresenter;
use fixture_sync::store::http::HttpFixtureStore;

const BANNER: &str = r#"
  _____ _      _                         ____
 |  ___(_)_  _| |_ _   _ _ __ ___  ___  / ___| _   _ _ __   ___
 | |_  | \ \/ / __| | | | '__/ _ \/ __| \___ \| | | | '_ \ / __|
 |  _| | |>  <| |_| |_| | | |  __/\__ \  ___) | |_| | | | | (__
 |_|   |_/_/\_\\__|\__,_|_|  \___||___/ |____/ \__, |_| |_|\___|
                                              |___/
  Live tournament fixtures — v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    println!("{BANNER}");

    let category = cfg.category()?;
    let event_offset = cfg.event_offset()?;
    info!(
        category = %category,
        store = %cfg.store.base_url,
        poll_interval_secs = cfg.sync.poll_interval_secs,
        utc_offset_minutes = cfg.sync.event_utc_offset_minutes,
        "fixture-sync starting up"
    );

    // -- Initialise components -------------------------------------------

    let store = HttpFixtureStore::new(
        &cfg.store.base_url,
        cfg.fetch_timeout(),
        cfg.store.user_agent.as_deref(),
    )
    .context("Failed to build fixture store client")?;

    let (presenter, view_rx) = WatchPresenter::channel();

    let engine = FixtureSyncEngine::new(
        Box::new(store),
        Box::new(presenter),
        category,
        event_offset,
    );
    let scheduler = PollScheduler::new(cfg.poll_interval(), cfg.initial_visibility());
    let (runner, handle) = SyncRunner::new(engine, scheduler);

    // -- Dashboard -------------------------------------------------------

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(view_rx, handle.clone()));
        dashboard::spawn_dashboard(state, cfg.dashboard.port).await?;
    } else {
        info!("Dashboard disabled");
    }

    // -- Sync loop -------------------------------------------------------

    info!("Press Ctrl+C to stop.");
    let engine = runner
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    drop(handle);

    info!(
        category = %engine.category(),
        fixtures = engine.fixtures().len(),
        "fixture-sync stopped"
    );

    Ok(())
}

/// Initialise tracing subscriber with env filter.
///
/// Set `RUST_LOG=fixture_sync=debug` for verbose output.
/// Set `FIXTURE_SYNC_LOG_JSON=1` for JSON structured logging.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fixture_sync=info"));

    let json_logging = std::env::var("FIXTURE_SYNC_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
