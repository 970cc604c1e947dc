//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! `FIXTURE_STORE_URL`, when set, replaces `store.base_url` so the same
//! file can be used against staging and production.

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::Visibility;
use crate::types::Category;

/// Largest accepted event offset, in minutes either side of UTC.
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Environment variable overriding `store.base_url`.
pub const STORE_URL_ENV: &str = "FIXTURE_STORE_URL";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    pub category: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Local event timezone as minutes east of UTC.
    #[serde(default)]
    pub event_utc_offset_minutes: i32,
    #[serde(default = "default_true")]
    pub start_visible: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { enabled: true, port: 3000 }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from a TOML file and apply env overrides.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let mut config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;

        if let Ok(url) = Self::resolve_env(STORE_URL_ENV) {
            if !url.trim().is_empty() {
                config.store.base_url = url;
            }
        }

        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.store.base_url.trim().is_empty() {
            bail!("store.base_url must not be empty");
        }
        if self.store.fetch_timeout_secs == 0 {
            bail!("store.fetch_timeout_secs must be greater than zero");
        }
        if self.sync.poll_interval_secs == 0 {
            bail!("sync.poll_interval_secs must be greater than zero");
        }
        self.category()?;
        self.event_offset()?;
        Ok(())
    }

    pub fn category(&self) -> Result<Category> {
        Ok(self.sync.category.parse::<Category>()?)
    }

    pub fn event_offset(&self) -> Result<FixedOffset> {
        let minutes = self.sync.event_utc_offset_minutes;
        if minutes.abs() > MAX_OFFSET_MINUTES {
            bail!("sync.event_utc_offset_minutes out of range: {minutes}");
        }
        FixedOffset::east_opt(minutes * 60)
            .with_context(|| format!("sync.event_utc_offset_minutes out of range: {minutes}"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.store.fetch_timeout_secs)
    }

    pub fn initial_visibility(&self) -> Visibility {
        Visibility::from(self.sync.start_visible)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
