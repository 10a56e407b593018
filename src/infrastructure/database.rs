use crate::config::RunnerConfig;
use crate::models::ApplyOutcome;
use crate::services::migrator::{MigrationEngine, MigrationEngineFactory};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::any::{AnyConnectOptions, AnyPoolOptions, install_default_drivers};
use sqlx::migrate::{Migrate, Migrator};
use sqlx::{AnyPool, ConnectOptions};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub connect_timeout: Duration,
    pub ignore_missing: bool,
}

impl From<&RunnerConfig> for EngineOptions {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            connect_timeout: config.db_connect_timeout,
            ignore_missing: config.ignore_missing,
        }
    }
}

/// Opens [`SqlxMigrationEngine`]s for MySQL, PostgreSQL and SQLite URLs.
pub struct SqlxEngineFactory {
    options: EngineOptions,
}

impl SqlxEngineFactory {
    pub fn new(options: EngineOptions) -> Self {
        install_default_drivers();
        Self { options }
    }
}

#[async_trait]
impl MigrationEngineFactory for SqlxEngineFactory {
    async fn open(
        &self,
        migrations_dir: &Path,
        db_url: &str,
    ) -> Result<Box<dyn MigrationEngine>> {
        let mut migrator = Migrator::new(migrations_dir).await.with_context(|| {
            format!("failed to read migrations from {}", migrations_dir.display())
        })?;
        migrator.set_ignore_missing(self.options.ignore_missing);

        info!("📜 Resolved {} migration files", migrator.iter().count());

        let connect_options = AnyConnectOptions::from_str(db_url)
            .context("invalid database URL")?
            .log_statements(log::LevelFilter::Debug);

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.options.connect_timeout)
            .connect_with(connect_options)
            .await
            .context("failed to connect to database")?;

        info!("✅ Database connected successfully");

        Ok(Box::new(SqlxMigrationEngine { migrator, pool }))
    }
}

pub struct SqlxMigrationEngine {
    migrator: Migrator,
    pool: AnyPool,
}

impl SqlxMigrationEngine {
    async fn applied_versions(&self) -> Result<HashSet<i64>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire database connection")?;

        conn.ensure_migrations_table().await?;

        Ok(conn
            .list_applied_migrations()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect())
    }
}

#[async_trait]
impl MigrationEngine for SqlxMigrationEngine {
    async fn apply_pending(&mut self) -> Result<ApplyOutcome> {
        let before = self.applied_versions().await?;

        // The migrator checks dirty state, checksums and missing versions even
        // when nothing is pending.
        self.migrator.run(&self.pool).await?;

        let after = self.applied_versions().await?;
        let count = after.difference(&before).count();
        if count == 0 {
            return Ok(ApplyOutcome::NoChange);
        }

        info!("   - {} migrations applied", count);
        Ok(ApplyOutcome::Applied { count })
    }

    async fn close(&mut self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
