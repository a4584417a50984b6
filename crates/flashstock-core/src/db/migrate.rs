use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
}

/// Applies the forward-only SQL migrations in `migrations/`, tracking
/// progress in a `_migrations` table so repeated runs are no-ops.
pub struct Migrator {
    pool: PgPool,
}

impl Migrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn init_migration_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn get_applied_migrations(&self) -> Result<Vec<Migration>> {
        let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Migration {
                version: row.get("version"),
                name: row.get("name"),
                applied_at: row.get("applied_at"),
            })
            .collect())
    }

    async fn record_migration(&self, version: i64, name: &str) -> Result<()> {
        sqlx::query("INSERT INTO _migrations (version, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(version)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(())
    }

    pub async fn migrate(&self) -> Result<()> {
        self.init_migration_table().await?;
        let applied = self.get_applied_migrations().await?;

        let migrations = vec![(
            1,
            "initial_schema",
            include_str!("../../migrations/001_initial_schema.sql"),
        )];

        for (version, name, sql) in migrations {
            if applied.iter().any(|m| m.version == version) {
                continue;
            }

            info!(version, name, "applying migration");
            sqlx::raw_sql(sql).execute(&self.pool).await.map_err(Error::Database)?;
            self.record_migration(version, name).await?;
        }

        Ok(())
    }
}

/// Run migrations automatically on process start.
pub async fn auto_migrate(pool: &PgPool) -> Result<()> {
    Migrator::new(pool.clone()).migrate().await
}
