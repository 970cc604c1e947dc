//! Shared types for the fixture sync service.
//!
//! These types form the data model used across all modules: the wire
//! shape of a fixture as served by the fixture store, the filter and
//! category vocabularies, and the display payloads handed to presenters.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Tournament bracket partition. Each category has its own fixture list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "open-age")]
    OpenAge,
    #[serde(rename = "u17")]
    U17,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::OpenAge => "open-age",
            Category::U17 => "u17",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "open-age" => Ok(Category::OpenAge),
            "u17" => Ok(Category::U17),
            other => Err(FixtureError::UnknownCategory(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Status / filter
// ---------------------------------------------------------------------------

/// Match lifecycle status as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureStatus {
    Upcoming,
    Live,
    Completed,
}

impl fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureStatus::Upcoming => write!(f, "upcoming"),
            FixtureStatus::Live => write!(f, "live"),
            FixtureStatus::Completed => write!(f, "completed"),
        }
    }
}

/// User-selected status filter. `All` applies no filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Upcoming,
    Live,
    Completed,
}

impl StatusFilter {
    /// Every filter in control-surface order.
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Upcoming,
        StatusFilter::Live,
        StatusFilter::Completed,
    ];

    /// Whether a fixture with `status` belongs to this filter's view.
    pub fn matches(&self, status: FixtureStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Upcoming => status == FixtureStatus::Upcoming,
            StatusFilter::Live => status == FixtureStatus::Live,
            StatusFilter::Completed => status == FixtureStatus::Completed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Upcoming => "upcoming",
            StatusFilter::Live => "live",
            StatusFilter::Completed => "completed",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatusFilter {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(StatusFilter::All),
            "upcoming" => Ok(StatusFilter::Upcoming),
            "live" => Ok(StatusFilter::Live),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(FixtureError::InvalidFilter(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// Team summary attached to a fixture slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub name: String,
    #[serde(default)]
    pub crest_url: Option<String>,
}

/// One scheduled, live, or completed match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Absent in per-category snapshot files; stamped by the engine.
    #[serde(default)]
    pub category: Option<Category>,
    pub status: FixtureStatus,
    #[serde(deserialize_with = "deserialize_match_date")]
    pub match_date: DateTime<Utc>,
    /// `None` while the bracket slot is undecided.
    #[serde(default, deserialize_with = "deserialize_team_slot")]
    pub home_team: Option<TeamSummary>,
    #[serde(default, deserialize_with = "deserialize_team_slot")]
    pub away_team: Option<TeamSummary>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub home_score: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub away_score: u32,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub minute: u32,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub scheduled_time: Option<String>,
}

/// Body of `GET /assets/data/{category}/fixtures.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSnapshot {
    #[serde(default)]
    pub fixtures: Vec<Fixture>,
}

/// Parse a kickoff timestamp: RFC 3339 with any offset, or a naive
/// `YYYY-MM-DDTHH:MM:SS` taken as UTC.
pub fn parse_match_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|pat| NaiveDateTime::parse_from_str(raw, pat).ok())
                .map(|naive| naive.and_utc())
        })
}

fn deserialize_match_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_match_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unparseable match_date: {raw}")))
}

/// Ids arrive as strings or integers; both normalise to the string form.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

/// Scores and minute are `null` while not meaningful; read that as 0.
fn deserialize_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_default())
}

/// Team slots arrive as an object, `null`, or a bare string (`"TBD"` for an
/// undecided slot).
fn deserialize_team_slot<'de, D>(deserializer: D) -> Result<Option<TeamSummary>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Slot {
        Team(TeamSummary),
        Name(String),
    }

    Ok(match Option::<Slot>::deserialize(deserializer)? {
        Some(Slot::Team(team)) if !is_tbd(&team.name) => Some(team),
        Some(Slot::Name(name)) if !is_tbd(&name) => Some(TeamSummary { name, crest_url: None }),
        _ => None,
    })
}

fn is_tbd(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.eq_ignore_ascii_case("tbd")
}

// ---------------------------------------------------------------------------
// Display payloads
// ---------------------------------------------------------------------------

/// Display name used for undecided bracket slots.
pub const TBD: &str = "TBD";

/// A team as shown to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayTeam {
    pub name: String,
    pub crest_url: Option<String>,
}

/// Per-fixture display payload computed at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayFixture {
    pub id: String,
    pub status: FixtureStatus,
    pub home: DisplayTeam,
    pub away: DisplayTeam,
    pub venue: Option<String>,
    /// Kickoff time for upcoming fixtures, otherwise the score line.
    pub headline: String,
    pub is_live: bool,
}

/// Fixtures sharing a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateGroup {
    pub date_label: String,
    pub fixtures: Vec<DisplayFixture>,
}

/// Filter control descriptor. Exactly one button is active per view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterButton {
    pub filter: StatusFilter,
    pub label: String,
    pub active: bool,
}

/// A rendered fixture list ready for a presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureView {
    pub category: Category,
    pub active_filter: StatusFilter,
    pub filters: Vec<FilterButton>,
    pub groups: Vec<DateGroup>,
}

/// Terminal initialisation failure shown with a retry affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub message: String,
    pub retryable: bool,
}

/// Whatever the presenter is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PresentedView {
    #[default]
    Loading,
    Fixtures(FixtureView),
    Error(ErrorView),
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for fixture sync.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Fixture fetch failed ({category}): {message}")]
    Fetch { category: Category, message: String },

    #[error("Live poll failed: {0}")]
    LivePoll(String),

    #[error("Invalid filter: {0:?} (expected all, upcoming, live or completed)")]
    InvalidFilter(String),

    #[error("Unknown category: {0:?} (expected open-age or u17)")]
    UnknownCategory(String),

    #[error("Sync loop is not running")]
    LoopStopped,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
