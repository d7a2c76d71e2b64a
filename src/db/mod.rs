#[cfg(feature = "embedded-postgres")]
pub mod embedded;
pub mod file;

use crate::config::Settings;
use crate::models::{
    AreaLockSummary, Candidate, CandidateLevel, CandidateVoteTally, ResidenceStatus, VoterRecord,
    VotingStatus,
};
use crate::tally::snapshot::SnapshotSource;
use async_trait::async_trait;
use log::info;
use sqlx::migrate::MigrateDatabase;
use sqlx::postgres::{PgListener, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::Row;

pub use file::FileSource;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Postgres error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Snapshot file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to read snapshot file: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "embedded-postgres")]
    #[error("Embedded Postgres error: {0}")]
    Embedded(#[from] postgresql_embedded::Error),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Tables whose writes must wake up watchers.
pub const WATCHED_TABLES: [&str; 4] = ["voters", "area_stats", "voting_results", "candidates"];

pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.database_url)
            .await?;
        info!("Connected to database (max {} connections)", settings.max_connections);
        Ok(Self { pool })
    }

    /// Creates the database itself when it does not exist yet.
    pub async fn create_if_missing(database_url: &str) -> Result<()> {
        if !Postgres::database_exists(database_url).await.unwrap_or(false) {
            info!("Creating database {}", database_url);
            Postgres::create_database(database_url).await?;
        }
        Ok(())
    }

    /// Subscribes to the change channel the triggers notify on.
    pub async fn listener(&self, channel: &str) -> Result<PgListener> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(channel).await?;
        info!("Listening for changes on channel {}", channel);
        Ok(listener)
    }

    /// Creates the four backend tables and the statement-level triggers that
    /// publish `pg_notify(<channel>, <table name>)` on every write.
    pub async fn init_schema(&self, channel: &str) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS voters (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                cccd TEXT,
                voter_card_number TEXT,
                area_id TEXT NOT NULL,
                unit_id TEXT,
                neighborhood_id TEXT,
                group_name TEXT,
                voting_status TEXT NOT NULL DEFAULT 'chua-bau',
                residence_status TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS voters_area_id_idx ON voters (area_id);")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS area_stats (
                area_id TEXT PRIMARY KEY,
                is_locked BOOLEAN NOT NULL DEFAULT FALSE,
                total_voters INTEGER NOT NULL DEFAULT 0,
                issued_votes INTEGER NOT NULL DEFAULT 0,
                received_votes INTEGER NOT NULL DEFAULT 0,
                valid_votes INTEGER NOT NULL DEFAULT 0,
                invalid_votes INTEGER NOT NULL DEFAULT 0,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candidates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                unit_id TEXT NOT NULL,
                level TEXT NOT NULL DEFAULT 'phuong'
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS voting_results (
                candidate_id TEXT NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
                area_id TEXT NOT NULL,
                votes INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (candidate_id, area_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE OR REPLACE FUNCTION notify_tally_change() RETURNS trigger AS $$
            BEGIN
                PERFORM pg_notify(TG_ARGV[0], TG_TABLE_NAME);
                RETURN NULL;
            END;
            $$ LANGUAGE plpgsql;
            "#,
        )
        .execute(&self.pool)
        .await?;

        let channel = channel.replace('\'', "''");
        for table in WATCHED_TABLES {
            sqlx::query(&format!("DROP TRIGGER IF EXISTS {table}_tally_change ON {table};"))
                .execute(&self.pool)
                .await?;
            sqlx::query(&format!(
                "CREATE TRIGGER {table}_tally_change \
                 AFTER INSERT OR UPDATE OR DELETE OR TRUNCATE ON {table} \
                 FOR EACH STATEMENT EXECUTE FUNCTION notify_tally_change('{channel}');"
            ))
            .execute(&self.pool)
            .await?;
        }

        info!("Schema ready; changes notify on channel {}", channel);
        Ok(())
    }
}

// Counts are INTEGER columns; NULL and negative values read as zero.
fn count(row: &PgRow, column: &str) -> Result<u64> {
    let value: Option<i32> = row.try_get(column)?;
    Ok(value.map_or(0, |v| v.max(0) as u64))
}

fn voter_from_row(row: &PgRow) -> Result<VoterRecord> {
    let voting_status: Option<String> = row.try_get("voting_status")?;
    let residence_status: Option<String> = row.try_get("residence_status")?;
    Ok(VoterRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        cccd: row.try_get("cccd")?,
        voter_card_number: row.try_get("voter_card_number")?,
        area_id: row.try_get("area_id")?,
        unit_id: row.try_get("unit_id")?,
        neighborhood_id: row.try_get("neighborhood_id")?,
        group_name: row.try_get("group_name")?,
        voting_status: voting_status
            .as_deref()
            .map(VotingStatus::from_db)
            .unwrap_or_default(),
        residence_status: residence_status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(ResidenceStatus::from_db),
    })
}

#[async_trait]
impl SnapshotSource for Database {
    async fn fetch_voters(&self) -> Result<Vec<VoterRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, cccd, voter_card_number, area_id, voting_status,
                   unit_id, neighborhood_id, group_name, residence_status
            FROM voters
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(voter_from_row).collect()
    }

    async fn fetch_area_lock_summaries(&self) -> Result<Vec<AreaLockSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT area_id, is_locked, total_voters, issued_votes, received_votes,
                   valid_votes, invalid_votes
            FROM area_stats
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(AreaLockSummary {
                    area_id: row.try_get("area_id")?,
                    is_locked: row.try_get::<Option<bool>, _>("is_locked")?.unwrap_or(false),
                    total_voters: count(row, "total_voters")?,
                    issued_ballots: count(row, "issued_votes")?,
                    received_ballots: count(row, "received_votes")?,
                    valid_ballots: count(row, "valid_votes")?,
                    invalid_ballots: count(row, "invalid_votes")?,
                })
            })
            .collect()
    }

    async fn fetch_candidate_tallies(&self) -> Result<Vec<CandidateVoteTally>> {
        let rows = sqlx::query("SELECT candidate_id, area_id, votes FROM voting_results")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(CandidateVoteTally {
                    candidate_id: row.try_get("candidate_id")?,
                    area_id: row.try_get("area_id")?,
                    votes: count(row, "votes")?,
                })
            })
            .collect()
    }

    // Ordered by id so tied candidates rank the same way on every refresh.
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        let rows = sqlx::query("SELECT id, name, unit_id, level FROM candidates ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let level: Option<String> = row.try_get("level")?;
                Ok(Candidate {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    unit_id: row.try_get("unit_id")?,
                    level: level.as_deref().map(CandidateLevel::from_db).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn count_voters_in_areas(&self, area_ids: &[&str]) -> Result<u64> {
        let ids: Vec<String> = area_ids.iter().map(|id| id.to_string()).collect();
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM voters WHERE area_id = ANY($1)")
            .bind(ids)
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }
}
