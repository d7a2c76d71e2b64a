use crate::db;
use crate::models::{
    hierarchy, AreaLockSummary, Candidate, CandidateVoteTally, VoterRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Read side of the backend. The engine never writes through it.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_voters(&self) -> db::Result<Vec<VoterRecord>>;

    async fn fetch_area_lock_summaries(&self) -> db::Result<Vec<AreaLockSummary>>;

    async fn fetch_candidate_tallies(&self) -> db::Result<Vec<CandidateVoteTally>>;

    async fn fetch_candidates(&self) -> db::Result<Vec<Candidate>>;

    /// Raw number of voter rows in the given areas, ignoring lock state.
    async fn count_voters_in_areas(&self, area_ids: &[&str]) -> db::Result<u64>;

    /// All four tables for one snapshot. Runs the fetches concurrently unless
    /// the source can read them in one go.
    async fn fetch_tables(&self) -> db::Result<Tables> {
        let (voters, summaries, tallies, candidates) = tokio::try_join!(
            self.fetch_voters(),
            self.fetch_area_lock_summaries(),
            self.fetch_candidate_tallies(),
            self.fetch_candidates(),
        )?;
        Ok(Tables {
            voters,
            summaries,
            tallies,
            candidates,
        })
    }
}

/// Raw table contents, before unknown areas are dropped.
#[derive(Debug, Default)]
pub struct Tables {
    pub voters: Vec<VoterRecord>,
    pub summaries: Vec<AreaLockSummary>,
    pub tallies: Vec<CandidateVoteTally>,
    pub candidates: Vec<Candidate>,
}

/// An immutable view of the three stores plus the candidate list.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    voters: Vec<VoterRecord>,
    summaries: HashMap<String, AreaLockSummary>,
    tallies: Vec<CandidateVoteTally>,
    candidates: Vec<Candidate>,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Builds a snapshot, dropping voter and tally rows whose area is not in the hierarchy.
    pub fn new(
        voters: Vec<VoterRecord>,
        summaries: Vec<AreaLockSummary>,
        tallies: Vec<CandidateVoteTally>,
        candidates: Vec<Candidate>,
    ) -> Self {
        let voter_count = voters.len();
        let voters: Vec<VoterRecord> = voters
            .into_iter()
            .filter(|voter| hierarchy::is_area(&voter.area_id))
            .collect();
        if voters.len() < voter_count {
            warn!(
                "Ignoring {} voter record(s) with an unknown area id",
                voter_count - voters.len()
            );
        }

        let tally_count = tallies.len();
        let tallies: Vec<CandidateVoteTally> = tallies
            .into_iter()
            .filter(|tally| hierarchy::is_area(&tally.area_id))
            .collect();
        if tallies.len() < tally_count {
            warn!(
                "Ignoring {} vote tally row(s) with an unknown area id",
                tally_count - tallies.len()
            );
        }

        let summaries = summaries
            .into_iter()
            .map(|summary| (summary.area_id.clone(), summary))
            .collect();

        Self {
            voters,
            summaries,
            tallies,
            candidates,
            fetched_at: Utc::now(),
        }
    }

    pub async fn fetch(source: &dyn SnapshotSource) -> db::Result<Self> {
        let tables = source.fetch_tables().await?;
        Ok(Self::new(
            tables.voters,
            tables.summaries,
            tables.tallies,
            tables.candidates,
        ))
    }

    pub fn voters(&self) -> &[VoterRecord] {
        &self.voters
    }

    pub fn summary(&self, area_id: &str) -> Option<&AreaLockSummary> {
        self.summaries.get(area_id)
    }

    /// The summary for an area, only if the station has closed its books.
    pub fn locked_summary(&self, area_id: &str) -> Option<&AreaLockSummary> {
        self.summary(area_id).filter(|summary| summary.is_locked)
    }

    pub fn tallies(&self) -> &[CandidateVoteTally] {
        &self.tallies
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
            && self.summaries.is_empty()
            && self.tallies.is_empty()
            && self.candidates.is_empty()
    }
}

/// Result of one refresh round.
pub struct Refresh {
    pub snapshot: Arc<Snapshot>,
    /// False when the fetch failed and a stale (or empty) snapshot is served.
    pub fresh: bool,
}

/// Fetches snapshots and keeps the last good one around for when the backend fails.
pub struct SnapshotLoader {
    source: Arc<dyn SnapshotSource>,
    last_good: Option<Arc<Snapshot>>,
}

impl SnapshotLoader {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            last_good: None,
        }
    }

    pub async fn refresh(&mut self) -> Refresh {
        match Snapshot::fetch(self.source.as_ref()).await {
            Ok(snapshot) => {
                info!(
                    "Fetched snapshot: {} voters, {} tallies, {} candidates",
                    snapshot.voters().len(),
                    snapshot.tallies().len(),
                    snapshot.candidates().len()
                );
                let snapshot = Arc::new(snapshot);
                self.last_good = Some(Arc::clone(&snapshot));
                Refresh {
                    snapshot,
                    fresh: true,
                }
            }
            Err(e) => {
                error!("Failed to fetch snapshot, serving stale data: {}", e);
                let snapshot = self
                    .last_good
                    .clone()
                    .unwrap_or_else(|| Arc::new(Snapshot::default()));
                Refresh {
                    snapshot,
                    fresh: false,
                }
            }
        }
    }
}
