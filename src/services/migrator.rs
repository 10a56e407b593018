use crate::error::MigrationError;
use crate::models::{ApplyOutcome, MigrationEvent};
use crate::services::staging::{StagingOptions, stage};
use crate::services::storage::ObjectStoreConnector;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub const SUCCESS_MESSAGE: &str = "Migration completed successfully";

/// A migration engine bound to one migrations directory and one database.
#[async_trait]
pub trait MigrationEngine: Send {
    /// Applies every pending forward migration. Having nothing to apply is
    /// reported as [`ApplyOutcome::NoChange`], not as an error.
    async fn apply_pending(&mut self) -> Result<ApplyOutcome>;

    /// Releases database and source handles.
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait MigrationEngineFactory: Send + Sync {
    async fn open(&self, migrations_dir: &Path, db_url: &str)
    -> Result<Box<dyn MigrationEngine>>;
}

/// Handles one invocation: validate, open a session, stage, migrate, clean up.
pub struct MigrationRunner {
    connector: Arc<dyn ObjectStoreConnector>,
    engines: Arc<dyn MigrationEngineFactory>,
    staging: StagingOptions,
}

impl MigrationRunner {
    pub fn new(
        connector: Arc<dyn ObjectStoreConnector>,
        engines: Arc<dyn MigrationEngineFactory>,
        staging: StagingOptions,
    ) -> Self {
        Self {
            connector,
            engines,
            staging,
        }
    }

    #[tracing::instrument(
        skip_all,
        fields(bucket = %event.s3_bucket, prefix = %event.s3_key_prefix)
    )]
    pub async fn handle(&self, event: &MigrationEvent) -> Result<String, MigrationError> {
        event
            .validate()
            .map_err(|e| MigrationError::Configuration(e.to_string()))?;

        let source = event.source();

        let store = self
            .connector
            .connect(&source.bucket)
            .await
            .map_err(MigrationError::Session)?;

        let staged = stage(store.as_ref(), &source, &self.staging).await?;

        let result = self.apply(staged.path(), &event.db_url).await;

        let staged_dir = staged.path().to_path_buf();
        if let Err(e) = staged.cleanup() {
            warn!(
                "⚠️  Failed to remove staging directory {}: {}",
                staged_dir.display(),
                e
            );
        }

        match result.map_err(MigrationError::Engine)? {
            ApplyOutcome::Applied { count } => info!("✅ Applied {} migrations", count),
            ApplyOutcome::NoChange => info!("✅ No pending migrations"),
        }

        Ok(SUCCESS_MESSAGE.to_string())
    }

    async fn apply(&self, migrations_dir: &Path, db_url: &str) -> Result<ApplyOutcome> {
        let mut engine = self
            .engines
            .open(migrations_dir, db_url)
            .await
            .context("failed to create migration engine")?;

        info!("🔄 Applying pending migrations...");
        let result = engine.apply_pending().await;

        if let Err(e) = engine.close().await {
            warn!("⚠️  Error closing migration engine: {:#}", e);
        }

        result
    }
}
