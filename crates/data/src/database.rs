use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    /// Creates a new database client connected to the specified `PostgreSQL`
    /// database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Creates the alerts table if it does not exist yet.
    ///
    /// The surrogate id is the cooldown gate's recency key, so it must be
    /// monotonically increasing per insert.
    ///
    /// # Errors
    /// Returns an error if the DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS alerts (
                id BIGSERIAL PRIMARY KEY,
                symbol TEXT NOT NULL,
                alerted_at TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(r"CREATE INDEX IF NOT EXISTS alerts_symbol_id_idx ON alerts (symbol, id DESC)")
            .execute(&self.pool)
            .await?;

        tracing::info!("Alert schema ready");
        Ok(())
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}
