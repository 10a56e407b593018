use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Lambda invocation payload.
///
/// Absent fields deserialize as empty strings so that they are rejected by
/// validation rather than by the JSON decoder.
#[derive(Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct MigrationEvent {
    #[validate(length(min = 1, message = "db_url is required"))]
    pub db_url: String,
    #[validate(length(min = 1, message = "s3_bucket is required"))]
    pub s3_bucket: String,
    #[validate(length(min = 1, message = "s3_key_prefix is required"))]
    pub s3_key_prefix: String,
}

impl MigrationEvent {
    pub fn source(&self) -> MigrationSource {
        MigrationSource {
            bucket: self.s3_bucket.clone(),
            prefix: self.s3_key_prefix.clone(),
        }
    }
}

// db_url carries credentials and must never reach the logs.
impl fmt::Debug for MigrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationEvent")
            .field("db_url", &"<redacted>")
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_key_prefix", &self.s3_key_prefix)
            .finish()
    }
}

/// Bucket and key prefix selecting a set of migration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSource {
    pub bucket: String,
    pub prefix: String,
}

impl fmt::Display for MigrationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

/// Result of a forward migration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { count: usize },
    /// Nothing was pending. Not an error.
    NoChange,
}
