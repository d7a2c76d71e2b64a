use crate::models::VoterRecord;
use crate::tally::progress::percent_of;
use crate::tally::scope::ScopeRow;
use crate::tally::snapshot::Snapshot;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VoterFilter {
    Voted,
    /// Anyone without a check-in, declined voters included.
    #[default]
    NotVoted,
    All,
}

impl VoterFilter {
    pub fn accepts(&self, voter: &VoterRecord) -> bool {
        match self {
            VoterFilter::Voted => voter.has_voted(),
            VoterFilter::NotVoted => !voter.has_voted(),
            VoterFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillOrder {
    /// Not-voted first, then by name. The dashboard's station drill-down.
    VotedLast,
    ByName,
    /// Snapshot order.
    Insertion,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrillDown {
    pub total: u64,
    pub voted: u64,
    pub not_voted: u64,
    pub percent: f64,
    pub filter: VoterFilter,
    pub voters: Vec<VoterRecord>,
}

/// Lists the voters of a scope. The counts always describe the whole scope,
/// the list only those passing `filter`.
pub fn drill_down<'a, I>(voters: I, filter: VoterFilter, order: DrillOrder) -> DrillDown
where
    I: IntoIterator<Item = &'a VoterRecord>,
{
    let scoped: Vec<&VoterRecord> = voters.into_iter().collect();
    let total = scoped.len() as u64;
    let voted = scoped.iter().filter(|voter| voter.has_voted()).count() as u64;

    let mut listed: Vec<VoterRecord> = scoped
        .into_iter()
        .filter(|voter| filter.accepts(voter))
        .cloned()
        .collect();
    match order {
        DrillOrder::VotedLast => listed.sort_by(|a, b| {
            a.has_voted()
                .cmp(&b.has_voted())
                .then_with(|| by_name(a, b))
        }),
        DrillOrder::ByName => listed.sort_by(by_name),
        DrillOrder::Insertion => {}
    }

    DrillDown {
        total,
        voted,
        not_voted: total - voted,
        percent: percent_of(voted, total, 1),
        filter,
        voters: listed,
    }
}

fn by_name(a: &VoterRecord, b: &VoterRecord) -> Ordering {
    a.name.cmp(&b.name)
}

/// Voters registered at one polling station, as opened from the station map.
pub fn area_drill_down(area_id: &str, snapshot: &Snapshot, filter: VoterFilter) -> DrillDown {
    let voters = snapshot.voters().iter().filter(|voter| voter.area_id == area_id);
    drill_down(voters, filter, DrillOrder::VotedLast)
}

/// Voters behind any aggregated row, sorted by name.
pub fn row_drill_down(row: &ScopeRow, snapshot: &Snapshot, filter: VoterFilter) -> DrillDown {
    let voters = snapshot.voters().iter().filter(|voter| row.selector.matches(voter));
    drill_down(voters, filter, DrillOrder::ByName)
}
