use crate::db::Result;
use log::info;
use postgresql_embedded::PostgreSQL;

const DATABASE_NAME: &str = "ward_tally";

/// A throwaway local Postgres server for development.
pub struct EmbeddedServer {
    postgresql: PostgreSQL,
    url: String,
}

impl EmbeddedServer {
    pub async fn start() -> Result<Self> {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        if !postgresql.database_exists(DATABASE_NAME).await? {
            postgresql.create_database(DATABASE_NAME).await?;
        }
        let url = postgresql.settings().url(DATABASE_NAME);
        info!("Embedded Postgres running on port {}", postgresql.settings().port);
        Ok(Self { postgresql, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn stop(self) -> Result<()> {
        self.postgresql.stop().await?;
        Ok(())
    }
}
