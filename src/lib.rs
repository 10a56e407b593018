pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::RunnerConfig;
use crate::infrastructure::database::SqlxEngineFactory;
use crate::infrastructure::storage::S3Connector;
use crate::services::migrator::MigrationRunner;
use std::sync::Arc;

/// Wires the production collaborators: S3 sessions and the sqlx engine.
pub fn create_runner(config: &RunnerConfig) -> MigrationRunner {
    MigrationRunner::new(
        Arc::new(S3Connector::new(config)),
        Arc::new(SqlxEngineFactory::new(config.into())),
        config.into(),
    )
}
