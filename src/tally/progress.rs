use crate::models::VoterRecord;
use crate::tally::scope::{CountSource, ScopeRow};
use crate::tally::snapshot::Snapshot;
use serde::Serialize;
use std::collections::HashMap;

/// Turnout at or above this is on target.
pub const GOOD_THRESHOLD: f64 = 90.0;
/// Turnout at or above this, but under `GOOD_THRESHOLD`, is average.
pub const AVERAGE_THRESHOLD: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Slow,
    Average,
    Good,
}

impl ProgressStatus {
    pub fn classify(percent: f64) -> Self {
        if percent >= GOOD_THRESHOLD {
            ProgressStatus::Good
        } else if percent >= AVERAGE_THRESHOLD {
            ProgressStatus::Average
        } else {
            ProgressStatus::Slow
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `part / whole * 100`, rounded; zero when `whole` is zero.
pub fn percent_of(part: u64, whole: u64, decimals: i32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, decimals)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeStat {
    pub total: u64,
    pub voted: u64,
    pub percent: f64,
    pub status: ProgressStatus,
    pub is_locked: bool,
    pub locked_areas: usize,
    pub area_count: usize,
}

impl ScopeStat {
    fn from_counts(total: u64, voted: u64, locked_areas: usize, area_count: usize) -> Self {
        let percent = percent_of(voted, total, 1);
        Self {
            total,
            voted,
            percent,
            status: ProgressStatus::classify(percent),
            // A rollup is locked only once every one of its stations is.
            is_locked: area_count > 0 && locked_areas == area_count,
            locked_areas,
            area_count,
        }
    }

    pub fn not_voted(&self) -> u64 {
        self.total.saturating_sub(self.voted)
    }
}

#[derive(Default, Clone, Copy)]
struct LiveCount {
    total: u64,
    voted: u64,
}

/// Sums a set of areas, choosing per area between the locked summary and
/// the live check-ins of `voters` registered there.
pub fn aggregate_areas<'a, S, I>(area_ids: &[S], voters: I, snapshot: &Snapshot) -> ScopeStat
where
    S: AsRef<str>,
    I: IntoIterator<Item = &'a VoterRecord>,
{
    let mut live: HashMap<&str, LiveCount> = HashMap::new();
    for voter in voters {
        let count = live.entry(voter.area_id.as_str()).or_default();
        count.total += 1;
        if voter.has_voted() {
            count.voted += 1;
        }
    }

    let mut total = 0;
    let mut voted = 0;
    let mut locked_areas = 0;
    for area_id in area_ids {
        let area_id = area_id.as_ref();
        if let Some(summary) = snapshot.locked_summary(area_id) {
            total += summary.total_voters;
            voted += summary.received_ballots;
            locked_areas += 1;
        } else if let Some(count) = live.get(area_id) {
            total += count.total;
            voted += count.voted;
        }
    }

    ScopeStat::from_counts(total, voted, locked_areas, area_ids.len())
}

/// Counts check-ins only. Never reports a lock.
pub fn live_stat<'a, I>(voters: I) -> ScopeStat
where
    I: IntoIterator<Item = &'a VoterRecord>,
{
    let mut total = 0;
    let mut voted = 0;
    for voter in voters {
        total += 1;
        if voter.has_voted() {
            voted += 1;
        }
    }
    ScopeStat::from_counts(total, voted, 0, 0)
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregatedRow {
    pub key: String,
    pub display_id: String,
    pub label: String,
    pub sub_label: String,
    pub detail: Option<String>,
    pub members: Vec<String>,
    pub area_ids: Vec<String>,
    #[serde(flatten)]
    pub stat: ScopeStat,
}

pub fn aggregate_row(row: &ScopeRow, snapshot: &Snapshot) -> AggregatedRow {
    let voters = snapshot.voters().iter().filter(|voter| row.selector.matches(voter));
    let stat = match row.source {
        CountSource::Hybrid => aggregate_areas(row.area_ids.as_slice(), voters, snapshot),
        CountSource::LiveOnly => live_stat(voters),
    };
    AggregatedRow {
        key: row.key.clone(),
        display_id: row.display_id.clone(),
        label: row.label.clone(),
        sub_label: row.sub_label.clone(),
        detail: row.detail.clone(),
        members: row.members.clone(),
        area_ids: row.area_ids.clone(),
        stat,
    }
}
