pub mod hierarchy;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub use hierarchy::{LocationKind, LocationNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotingStatus {
    #[serde(rename = "chua-bau")]
    NotVoted,
    #[serde(rename = "da-bau")]
    Voted,
    #[serde(rename = "khong-bau")]
    Declined,
}

impl VotingStatus {
    // Unrecognised values count as not voted; imported rolls are not always clean.
    pub fn from_db(value: &str) -> Self {
        match value {
            "da-bau" => VotingStatus::Voted,
            "khong-bau" => VotingStatus::Declined,
            _ => VotingStatus::NotVoted,
        }
    }
}

impl Default for VotingStatus {
    fn default() -> Self {
        VotingStatus::NotVoted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResidenceStatus {
    #[serde(rename = "thuong-tru")]
    Permanent,
    #[serde(rename = "tam-tru")]
    Temporary,
    #[serde(rename = "tam-vang")]
    TemporarilyAbsent,
    #[serde(rename = "lam-an-xa")]
    WorkingAway,
    #[serde(rename = "hoc-xa")]
    StudyingAway,
    #[serde(rename = "da-chuyen-di")]
    MovedOut,
    #[serde(rename = "moi-chuyen-den")]
    NewlyArrived,
    #[serde(rename = "khac")]
    Other,
}

impl ResidenceStatus {
    pub fn from_db(value: &str) -> Self {
        match value {
            "thuong-tru" => ResidenceStatus::Permanent,
            "tam-tru" => ResidenceStatus::Temporary,
            "tam-vang" => ResidenceStatus::TemporarilyAbsent,
            "lam-an-xa" => ResidenceStatus::WorkingAway,
            "hoc-xa" => ResidenceStatus::StudyingAway,
            "da-chuyen-di" => ResidenceStatus::MovedOut,
            "moi-chuyen-den" => ResidenceStatus::NewlyArrived,
            _ => ResidenceStatus::Other,
        }
    }
}

// Exported rows carry the same loose strings as the database columns: null,
// empty and unknown values read the way `from_db` reads them.
fn voting_status_from_db<'de, D: Deserializer<'de>>(deserializer: D) -> Result<VotingStatus, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().map(VotingStatus::from_db).unwrap_or_default())
}

fn residence_from_db<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ResidenceStatus>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(ResidenceStatus::from_db))
}

fn level_from_db<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CandidateLevel, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().map(CandidateLevel::from_db).unwrap_or_default())
}

/// One row per registered voter, as fetched from the `voters` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub cccd: Option<String>,
    #[serde(default)]
    pub voter_card_number: Option<String>,
    pub area_id: String,
    #[serde(default)]
    pub unit_id: Option<String>,
    #[serde(default)]
    pub neighborhood_id: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default, deserialize_with = "voting_status_from_db")]
    pub voting_status: VotingStatus,
    // Missing residence is treated as permanent residence.
    #[serde(default, deserialize_with = "residence_from_db")]
    pub residence_status: Option<ResidenceStatus>,
}

impl VoterRecord {
    pub fn has_voted(&self) -> bool {
        self.voting_status == VotingStatus::Voted
    }

    pub fn is_permanent_resident(&self) -> bool {
        matches!(self.residence_status, None | Some(ResidenceStatus::Permanent))
    }

    pub fn is_temporary_resident(&self) -> bool {
        self.residence_status == Some(ResidenceStatus::Temporary)
    }
}

/// Counts submitted by a polling station. Authoritative once `is_locked`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaLockSummary {
    pub area_id: String,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub total_voters: u64,
    #[serde(default, alias = "issued_votes")]
    pub issued_ballots: u64,
    #[serde(default, alias = "received_votes")]
    pub received_ballots: u64,
    #[serde(default, alias = "valid_votes")]
    pub valid_ballots: u64,
    #[serde(default, alias = "invalid_votes")]
    pub invalid_ballots: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVoteTally {
    pub candidate_id: String,
    pub area_id: String,
    pub votes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateLevel {
    #[serde(rename = "quoc-hoi")]
    National,
    #[serde(rename = "thanh-pho")]
    City,
    #[serde(rename = "phuong")]
    Ward,
}

impl CandidateLevel {
    pub fn from_db(value: &str) -> Self {
        match value {
            "quoc-hoi" => CandidateLevel::National,
            "thanh-pho" => CandidateLevel::City,
            _ => CandidateLevel::Ward,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CandidateLevel::National => "ĐB Quốc hội",
            CandidateLevel::City => "HĐND Thành phố",
            CandidateLevel::Ward => "HĐND Phường",
        }
    }
}

impl Default for CandidateLevel {
    fn default() -> Self {
        CandidateLevel::Ward
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub unit_id: String,
    #[serde(default, deserialize_with = "level_from_db")]
    pub level: CandidateLevel,
}
