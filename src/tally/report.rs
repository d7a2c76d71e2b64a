//! Station-level reporting: the report detail for a ward, unit or area, the
//! ward summary cards and the per-station status map.

use crate::db;
use crate::models::{hierarchy, Candidate, CandidateLevel, LocationKind};
use crate::tally::progress::{aggregate_areas, percent_of};
use crate::tally::ranking::votes_by_candidate;
use crate::tally::snapshot::{Snapshot, SnapshotSource};
use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;

/// An area counts as completed from this turnout ratio on.
pub const COMPLETION_RATIO: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ReportTarget {
    Ward,
    Unit(String),
    Area(String),
}

impl ReportTarget {
    /// Accepts `ward`, the ward id, a unit id or an area id. Anything else is
    /// kept as an area id that matches no station.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.eq_ignore_ascii_case("ward") {
            return ReportTarget::Ward;
        }
        match hierarchy::find(input).map(|node| node.kind) {
            Some(LocationKind::Ward) => ReportTarget::Ward,
            Some(LocationKind::Unit) => ReportTarget::Unit(input.to_string()),
            _ => ReportTarget::Area(input.to_string()),
        }
    }

    pub fn area_ids(&self) -> Vec<&'static str> {
        match self {
            ReportTarget::Ward => hierarchy::area_ids(),
            ReportTarget::Unit(unit_id) => hierarchy::areas_of_unit(unit_id).map(|a| a.id).collect(),
            ReportTarget::Area(area_id) => hierarchy::find_area(area_id).map(|a| a.id).into_iter().collect(),
        }
    }

    /// Ward reports list every candidate; unit and area reports only the unit's own.
    fn contests(&self, candidate: &Candidate) -> bool {
        match self {
            ReportTarget::Ward => true,
            ReportTarget::Unit(unit_id) => candidate.unit_id == *unit_id,
            ReportTarget::Area(area_id) => hierarchy::find_area(area_id)
                .and_then(|area| area.parent_id)
                .is_some_and(|unit_id| candidate.unit_id == unit_id),
        }
    }

    pub fn title(&self) -> String {
        match self {
            ReportTarget::Ward => hierarchy::ward().map(|w| w.name.to_string()).unwrap_or_default(),
            ReportTarget::Unit(id) | ReportTarget::Area(id) => hierarchy::find(id)
                .map(|node| node.name.to_string())
                .unwrap_or_else(|| id.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BallotStats {
    pub total_voters: u64,
    pub issued_ballots: u64,
    pub received_ballots: u64,
    pub valid_ballots: u64,
    pub invalid_ballots: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportCandidate {
    pub id: String,
    pub name: String,
    pub unit_id: String,
    pub level: CandidateLevel,
    pub votes: u64,
    /// Share of valid ballots, two decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDetail {
    pub target: ReportTarget,
    pub title: String,
    pub area_ids: Vec<String>,
    pub stats: BallotStats,
    pub is_locked: bool,
    pub locked_areas: usize,
    pub candidates: Vec<ReportCandidate>,
}

impl ReportDetail {
    /// Nothing submitted yet for a non-empty target; the total has to come
    /// from a raw count of the voter roll.
    pub fn needs_voter_count(&self) -> bool {
        self.stats.total_voters == 0 && !self.area_ids.is_empty()
    }

    pub fn apply_voter_count(&mut self, count: u64) {
        if self.needs_voter_count() {
            self.stats.total_voters = count;
        }
    }

    /// Runs the raw count against `source` when the submitted figures are empty.
    pub async fn fill_voter_count(&mut self, source: &dyn SnapshotSource) -> db::Result<()> {
        if !self.needs_voter_count() {
            return Ok(());
        }
        let ids: Vec<&str> = self.area_ids.iter().map(String::as_str).collect();
        let count = source.count_voters_in_areas(&ids).await?;
        self.apply_voter_count(count);
        Ok(())
    }
}

/// Sums every submitted station summary in the target, locked or not.
pub fn report_detail(target: ReportTarget, snapshot: &Snapshot) -> ReportDetail {
    let area_ids = target.area_ids();

    let mut stats = BallotStats::default();
    let mut locked_areas = 0;
    for area_id in &area_ids {
        if let Some(summary) = snapshot.summary(area_id) {
            stats.total_voters += summary.total_voters;
            stats.issued_ballots += summary.issued_ballots;
            stats.received_ballots += summary.received_ballots;
            stats.valid_ballots += summary.valid_ballots;
            stats.invalid_ballots += summary.invalid_ballots;
            if summary.is_locked {
                locked_areas += 1;
            }
        }
    }

    let in_target: Vec<_> = snapshot
        .tallies()
        .iter()
        .filter(|tally| area_ids.iter().any(|id| *id == tally.area_id))
        .cloned()
        .collect();
    let votes = votes_by_candidate(&in_target);

    let mut candidates: Vec<ReportCandidate> = snapshot
        .candidates()
        .iter()
        .filter(|c| target.contests(c))
        .map(|c| {
            let votes = votes.get(c.id.as_str()).copied().unwrap_or(0);
            ReportCandidate {
                id: c.id.clone(),
                name: c.name.clone(),
                unit_id: c.unit_id.clone(),
                level: c.level,
                votes,
                percentage: percent_of(votes, stats.valid_ballots, 2),
            }
        })
        .collect();
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes));

    if area_ids.is_empty() {
        warn!("Report target {:?} matches no polling station", target);
    }

    ReportDetail {
        title: target.title(),
        is_locked: !area_ids.is_empty() && locked_areas == area_ids.len(),
        area_ids: area_ids.into_iter().map(str::to_string).collect(),
        target,
        stats,
        locked_areas,
        candidates,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WardSummary {
    pub total: u64,
    pub voted: u64,
    pub not_voted: u64,
    pub completed_areas: usize,
    pub locked_areas: usize,
    pub total_areas: usize,
}

pub fn ward_summary(snapshot: &Snapshot) -> WardSummary {
    let areas = hierarchy::area_ids();
    let mut summary = WardSummary {
        total: 0,
        voted: 0,
        not_voted: 0,
        completed_areas: 0,
        locked_areas: 0,
        total_areas: areas.len(),
    };

    for area_id in areas {
        let voters = snapshot.voters().iter().filter(|voter| voter.area_id == area_id);
        let stat = aggregate_areas(&[area_id], voters, snapshot);
        summary.total += stat.total;
        summary.voted += stat.voted;
        summary.locked_areas += stat.locked_areas;
        if stat.total > 0 && stat.voted as f64 / stat.total as f64 >= COMPLETION_RATIO {
            summary.completed_areas += 1;
        }
    }
    summary.not_voted = summary.total.saturating_sub(summary.voted);
    summary
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    /// Books closed.
    Done,
    /// At least one check-in recorded.
    Voting,
    Empty,
}

pub fn station_status(area_id: &str, snapshot: &Snapshot) -> StationStatus {
    if snapshot.locked_summary(area_id).is_some() {
        StationStatus::Done
    } else if snapshot
        .voters()
        .iter()
        .any(|voter| voter.area_id == area_id && voter.has_voted())
    {
        StationStatus::Voting
    } else {
        StationStatus::Empty
    }
}

/// Status of every polling station, keyed by area id.
pub fn station_status_map(snapshot: &Snapshot) -> BTreeMap<&'static str, StationStatus> {
    hierarchy::areas()
        .map(|area| (area.id, station_status(area.id, snapshot)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VotingStatus;
    use crate::tally::snapshot::fixtures::*;

    fn open(area_id: &str, total_voters: u64, received: u64) -> crate::models::AreaLockSummary {
        let mut summary = locked(area_id, total_voters, received);
        summary.is_locked = false;
        summary
    }

    #[test]
    fn targets_parse_by_kind() {
        assert_eq!(ReportTarget::parse("ward"), ReportTarget::Ward);
        assert_eq!(ReportTarget::parse("bc"), ReportTarget::Ward);
        assert_eq!(ReportTarget::parse("unit_3"), ReportTarget::Unit("unit_3".into()));
        assert_eq!(ReportTarget::parse("kv07"), ReportTarget::Area("kv07".into()));
        assert!(ReportTarget::parse("kv99").area_ids().is_empty());
        assert_eq!(ReportTarget::Ward.area_ids().len(), 32);
    }

    #[test]
    fn unit_report_sums_every_submitted_summary() {
        let snapshot = Snapshot::new(
            vec![],
            vec![locked("kv01", 100, 80), open("kv02", 50, 20)],
            vec![
                tally("A", "kv01", 60),
                tally("B", "kv01", 20),
                tally("A", "kv02", 5),
                tally("X", "kv04", 40),
            ],
            vec![candidate("A", "unit_1"), candidate("B", "unit_1"), candidate("X", "unit_2")],
        );
        let detail = report_detail(ReportTarget::Unit("unit_1".into()), &snapshot);
        assert_eq!(detail.stats.total_voters, 150);
        assert_eq!(detail.stats.received_ballots, 100);
        assert_eq!(detail.stats.valid_ballots, 100);
        assert_eq!(detail.locked_areas, 1);
        assert!(!detail.is_locked);
        assert!(!detail.needs_voter_count());

        let votes: Vec<(&str, u64, f64)> = detail
            .candidates
            .iter()
            .map(|c| (c.id.as_str(), c.votes, c.percentage))
            .collect();
        assert_eq!(votes, vec![("A", 65, 65.0), ("B", 20, 20.0)]);
    }

    #[test]
    fn area_report_lists_its_unit_candidates() {
        let snapshot = Snapshot::new(
            vec![],
            vec![locked("kv05", 10, 8)],
            vec![tally("X", "kv05", 6), tally("X", "kv04", 100)],
            vec![candidate("A", "unit_1"), candidate("X", "unit_2")],
        );
        let detail = report_detail(ReportTarget::parse("kv05"), &snapshot);
        assert!(detail.is_locked);
        assert_eq!(detail.candidates.len(), 1);
        assert_eq!(detail.candidates[0].votes, 6);
        assert_eq!(detail.candidates[0].percentage, 75.0);
    }

    #[test]
    fn empty_report_falls_back_to_voter_count() {
        let mut detail = report_detail(ReportTarget::Unit("unit_8".into()), &Snapshot::default());
        assert!(detail.needs_voter_count());
        assert!(detail.candidates.iter().all(|c| c.percentage == 0.0));
        detail.apply_voter_count(412);
        assert_eq!(detail.stats.total_voters, 412);
        assert!(!detail.needs_voter_count());
    }

    #[test]
    fn unknown_area_reports_nothing() {
        let snapshot = Snapshot::new(vec![], vec![], vec![], vec![candidate("A", "unit_1")]);
        let detail = report_detail(ReportTarget::parse("kv404"), &snapshot);
        assert!(detail.candidates.is_empty());
        assert!(!detail.is_locked);
        assert!(!detail.needs_voter_count());
    }

    #[test]
    fn ward_summary_counts_completed_and_locked_stations() {
        let mut all = voters("kv01", 10, 9);
        all.extend(voters("kv02", 10, 8));
        let snapshot = Snapshot::new(all, vec![locked("kv03", 100, 95)], vec![], vec![]);
        let summary = ward_summary(&snapshot);
        assert_eq!(summary.total, 120);
        assert_eq!(summary.voted, 112);
        assert_eq!(summary.not_voted, 8);
        assert_eq!(summary.completed_areas, 2);
        assert_eq!(summary.locked_areas, 1);
        assert_eq!(summary.total_areas, 32);
    }

    #[test]
    fn station_status_reflects_lock_and_check_ins() {
        let snapshot = Snapshot::new(
            vec![voter("kv02", VotingStatus::Voted), voter("kv03", VotingStatus::Declined)],
            vec![locked("kv01", 10, 10)],
            vec![],
            vec![],
        );
        let map = station_status_map(&snapshot);
        assert_eq!(map.len(), 32);
        assert_eq!(map["kv01"], StationStatus::Done);
        assert_eq!(map["kv02"], StationStatus::Voting);
        assert_eq!(map["kv03"], StationStatus::Empty);
    }
}
