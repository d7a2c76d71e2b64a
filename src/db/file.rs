use crate::db::Result;
use crate::models::{AreaLockSummary, Candidate, CandidateVoteTally, VoterRecord};
use crate::tally::snapshot::{SnapshotSource, Tables};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// A JSON export of the four backend tables, keyed by table name.
#[derive(Debug, Default, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub voters: Vec<VoterRecord>,
    #[serde(default)]
    pub area_stats: Vec<AreaLockSummary>,
    #[serde(default)]
    pub voting_results: Vec<CandidateVoteTally>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Reads snapshots from a JSON file. Each snapshot reads and parses it once.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<SnapshotFile> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let mut file: SnapshotFile = serde_json::from_str(&raw)?;
        // Same order as the database fetch, so ties rank alike.
        file.candidates.sort_by(|a, b| a.id.cmp(&b.id));
        debug!("Read {} voters from {}", file.voters.len(), self.path.display());
        Ok(file)
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    async fn fetch_voters(&self) -> Result<Vec<VoterRecord>> {
        Ok(self.load().await?.voters)
    }

    async fn fetch_area_lock_summaries(&self) -> Result<Vec<AreaLockSummary>> {
        Ok(self.load().await?.area_stats)
    }

    async fn fetch_candidate_tallies(&self) -> Result<Vec<CandidateVoteTally>> {
        Ok(self.load().await?.voting_results)
    }

    async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self.load().await?.candidates)
    }

    async fn count_voters_in_areas(&self, area_ids: &[&str]) -> Result<u64> {
        let wanted: HashSet<&str> = area_ids.iter().copied().collect();
        let voters = self.load().await?.voters;
        Ok(voters
            .iter()
            .filter(|voter| wanted.contains(voter.area_id.as_str()))
            .count() as u64)
    }

    async fn fetch_tables(&self) -> Result<Tables> {
        let file = self.load().await?;
        Ok(Tables {
            voters: file.voters,
            summaries: file.area_stats,
            tallies: file.voting_results,
            candidates: file.candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateLevel, ResidenceStatus, VotingStatus};
    use crate::tally::report::{report_detail, ReportTarget};
    use crate::tally::snapshot::{Snapshot, SnapshotLoader};
    use std::sync::Arc;

    fn write_snapshot(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ward-tally-{}-{}.json", name, uuid::Uuid::new_v4()));
        std::fs::write(&path, body).unwrap();
        path
    }

    const SAMPLE: &str = r#"{
        "voters": [
            {"id": "1b4e28ba-2fa1-4d3b-a3f5-ef19b5a7633b", "name": "Nguyễn Văn A", "area_id": "kv01",
             "voting_status": "da-bau", "residence_status": "thuong-tru", "unit_id": "unit_1"},
            {"id": "6f1c2b8e-3a4d-4e5f-9a0b-1c2d3e4f5a6b", "name": "Trần Thị B", "area_id": "kv01",
             "voting_status": "chua-bau", "unit_id": "unit_1"},
            {"id": "0d9e8f7a-6b5c-4d3e-2f1a-0b9c8d7e6f5a", "name": "Lê Văn C", "area_id": "kv99"}
        ],
        "area_stats": [
            {"area_id": "kv02", "is_locked": true, "total_voters": 200, "issued_votes": 195,
             "received_votes": 190, "valid_votes": 185, "invalid_votes": 5}
        ],
        "voting_results": [{"candidate_id": "c2", "area_id": "kv02", "votes": 120}],
        "candidates": [
            {"id": "c2", "name": "Ứng cử viên 2", "unit_id": "unit_1", "level": "thanh-pho"},
            {"id": "c1", "name": "Ứng cử viên 1", "unit_id": "unit_1"}
        ]
    }"#;

    #[tokio::test]
    async fn reads_backend_column_names() {
        let path = write_snapshot("columns", SAMPLE);
        let source = FileSource::new(&path);
        let snapshot = Snapshot::fetch(&source).await.unwrap();

        // the kv99 voter is dropped
        assert_eq!(snapshot.voters().len(), 2);
        let summary = snapshot.locked_summary("kv02").unwrap();
        assert_eq!(summary.received_ballots, 190);
        assert_eq!(summary.valid_ballots, 185);
        let ids: Vec<&str> = snapshot.candidates().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);

        assert_eq!(source.count_voters_in_areas(&["kv01", "kv02"]).await.unwrap(), 2);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn loader_serves_last_good_snapshot_after_a_failure() {
        let path = write_snapshot("stale", SAMPLE);
        let mut loader = SnapshotLoader::new(Arc::new(FileSource::new(&path)));

        let first = loader.refresh().await;
        assert!(first.fresh);
        assert_eq!(first.snapshot.voters().len(), 2);

        std::fs::write(&path, "{ not json").unwrap();
        let second = loader.refresh().await;
        assert!(!second.fresh);
        assert_eq!(second.snapshot.voters().len(), 2);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn tables_come_from_a_single_read() {
        let path = write_snapshot("tables", SAMPLE);
        let tables = FileSource::new(&path).fetch_tables().await.unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(tables.voters.len(), 3);
        assert_eq!(tables.summaries.len(), 1);
        assert_eq!(tables.tallies.len(), 1);
        let ids: Vec<&str> = tables.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn loose_column_values_do_not_fail_the_snapshot() {
        let path = write_snapshot(
            "loose",
            r#"{
            "voters": [
                {"id": "1b4e28ba-2fa1-4d3b-a3f5-ef19b5a7633b", "name": "Nguyễn Văn A", "area_id": "kv01",
                 "voting_status": "da-bau", "residence_status": ""},
                {"id": "6f1c2b8e-3a4d-4e5f-9a0b-1c2d3e4f5a6b", "name": "Trần Thị B", "area_id": "kv01",
                 "voting_status": null, "residence_status": null},
                {"id": "0d9e8f7a-6b5c-4d3e-2f1a-0b9c8d7e6f5a", "name": "Lê Văn C", "area_id": "kv02",
                 "voting_status": "vang-mat", "residence_status": "ky-tuc-xa"}
            ],
            "candidates": [
                {"id": "c1", "name": "Ứng cử viên 1", "unit_id": "unit_1", "level": "phuong-xa"},
                {"id": "c2", "name": "Ứng cử viên 2", "unit_id": "unit_1", "level": null}
            ]
        }"#,
        );
        let snapshot = Snapshot::fetch(&FileSource::new(&path)).await.unwrap();
        std::fs::remove_file(path).ok();

        let voters = snapshot.voters();
        assert_eq!(voters.len(), 3);
        assert_eq!(voters[0].voting_status, VotingStatus::Voted);
        assert_eq!(voters[0].residence_status, None);
        assert!(voters[0].is_permanent_resident());
        assert_eq!(voters[1].voting_status, VotingStatus::NotVoted);
        assert_eq!(voters[1].residence_status, None);
        assert_eq!(voters[2].voting_status, VotingStatus::NotVoted);
        assert_eq!(voters[2].residence_status, Some(ResidenceStatus::Other));
        assert!(snapshot
            .candidates()
            .iter()
            .all(|c| c.level == CandidateLevel::Ward));
    }

    #[tokio::test]
    async fn empty_report_counts_only_the_targets_voters() {
        let path = write_snapshot(
            "fallback",
            r#"{
            "voters": [
                {"id": "1b4e28ba-2fa1-4d3b-a3f5-ef19b5a7633b", "name": "Nguyễn Văn A", "area_id": "kv01"},
                {"id": "6f1c2b8e-3a4d-4e5f-9a0b-1c2d3e4f5a6b", "name": "Trần Thị B", "area_id": "kv02"},
                {"id": "0d9e8f7a-6b5c-4d3e-2f1a-0b9c8d7e6f5a", "name": "Lê Văn C", "area_id": "kv03"},
                {"id": "7a2b3c4d-5e6f-4a1b-8c9d-0e1f2a3b4c5d", "name": "Phạm Thị D", "area_id": "kv04"},
                {"id": "8b3c4d5e-6f7a-4b2c-9d0e-1f2a3b4c5d6e", "name": "Hoàng Văn E", "area_id": "kv05"}
            ]
        }"#,
        );
        let source = FileSource::new(&path);
        let snapshot = Snapshot::fetch(&source).await.unwrap();

        let mut detail = report_detail(ReportTarget::Unit("unit_1".into()), &snapshot);
        assert!(detail.needs_voter_count());
        detail.fill_voter_count(&source).await.unwrap();
        assert_eq!(detail.stats.total_voters, 3);

        let mut area = report_detail(ReportTarget::Area("kv04".into()), &snapshot);
        area.fill_voter_count(&source).await.unwrap();
        assert_eq!(area.stats.total_voters, 1);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn missing_file_yields_empty_snapshot_before_first_success() {
        let mut loader = SnapshotLoader::new(Arc::new(FileSource::new("/nonexistent/ward-tally.json")));
        let refresh = loader.refresh().await;
        assert!(!refresh.fresh);
        assert!(refresh.snapshot.is_empty());
    }
}
