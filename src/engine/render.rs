//! View construction.
//!
//! Turns the cached fixture list into the grouped display structure a
//! presenter consumes. Everything here is pure: same cache, same filter,
//! same offset, same view.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::types::{
    Category, DateGroup, DisplayFixture, DisplayTeam, FilterButton, Fixture, FixtureStatus,
    FixtureView, StatusFilter, TeamSummary, TBD,
};

const DATE_LABEL_FORMAT: &str = "%A, %-d %B %Y";
const KICKOFF_FORMAT: &str = "%H:%M";

/// Build the presenter view for `fixtures` under `filter`.
///
/// Groups ascend by calendar date in the event's local offset; fixtures in
/// a group ascend by kickoff, ties keeping snapshot order.
pub fn build_view(
    fixtures: &[Fixture],
    category: Category,
    filter: StatusFilter,
    event_offset: FixedOffset,
) -> FixtureView {
    let mut visible: Vec<&Fixture> = fixtures
        .iter()
        .filter(|f| filter.matches(f.status))
        .collect();
    // Stable sort keeps store order for identical kickoffs.
    visible.sort_by_key(|f| f.match_date);

    let mut groups: Vec<DateGroup> = Vec::new();
    let mut current_date: Option<NaiveDate> = None;

    for fixture in visible {
        let date = local_date(fixture.match_date, event_offset);
        if current_date != Some(date) {
            current_date = Some(date);
            groups.push(DateGroup {
                date_label: date.format(DATE_LABEL_FORMAT).to_string(),
                fixtures: Vec::new(),
            });
        }
        if let Some(group) = groups.last_mut() {
            group.fixtures.push(display_fixture(fixture, event_offset));
        }
    }

    FixtureView {
        category,
        active_filter: filter,
        filters: filter_buttons(filter),
        groups,
    }
}

/// The four filter controls, with `active` marked.
pub fn filter_buttons(active: StatusFilter) -> Vec<FilterButton> {
    StatusFilter::ALL
        .iter()
        .map(|f| FilterButton {
            filter: *f,
            label: f.label().to_string(),
            active: *f == active,
        })
        .collect()
}

/// Compute the display payload for one fixture.
pub fn display_fixture(fixture: &Fixture, event_offset: FixedOffset) -> DisplayFixture {
    let headline = match fixture.status {
        FixtureStatus::Upcoming => kickoff_time(fixture, event_offset),
        FixtureStatus::Live => format!(
            "{} - {} ({}')",
            fixture.home_score, fixture.away_score, fixture.minute
        ),
        FixtureStatus::Completed => format!("{} - {}", fixture.home_score, fixture.away_score),
    };

    DisplayFixture {
        id: fixture.id.clone(),
        status: fixture.status,
        home: display_team(fixture.home_team.as_ref()),
        away: display_team(fixture.away_team.as_ref()),
        venue: fixture.venue.clone().filter(|v| !v.trim().is_empty()),
        headline,
        is_live: fixture.status == FixtureStatus::Live,
    }
}

/// Prefer the store's pre-formatted strings over deriving from `match_date`.
fn kickoff_time(fixture: &Fixture, event_offset: FixedOffset) -> String {
    [fixture.time.as_deref(), fixture.scheduled_time.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| {
            fixture
                .match_date
                .with_timezone(&event_offset)
                .format(KICKOFF_FORMAT)
                .to_string()
        })
}

fn display_team(team: Option<&TeamSummary>) -> DisplayTeam {
    match team {
        Some(t) => DisplayTeam {
            name: t.name.clone(),
            crest_url: t.crest_url.clone(),
        },
        None => DisplayTeam {
            name: TBD.to_string(),
            crest_url: None,
        },
    }
}

fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
