use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the migration runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// AWS region for the S3 session. There is no fallback region: a missing
    /// value fails the invocation in the session phase.
    pub aws_region: Option<String>,

    /// Custom S3 endpoint (MinIO, LocalStack)
    pub s3_endpoint: Option<String>,

    /// Use path-style addressing (default: false)
    pub force_path_style: bool,

    /// Probe the bucket with HeadBucket when opening a session (default: true)
    pub verify_bucket: bool,

    /// Parent directory for staging directories (default: OS temp dir)
    pub staging_root: PathBuf,

    /// Name prefix for staging directories (default: "migrations-")
    pub staging_prefix: String,

    /// Database connect timeout (default: 30s)
    pub db_connect_timeout: Duration,

    /// Tolerate applied versions missing from the staged set (default: false)
    pub ignore_missing: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            aws_region: None,
            s3_endpoint: None,
            force_path_style: false,
            verify_bucket: true,
            staging_root: env::temp_dir(),
            staging_prefix: "migrations-".to_string(),
            db_connect_timeout: Duration::from_secs(30),
            ignore_missing: false,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            aws_region: non_empty_var("MIGRATION_AWS_REGION")
                .or_else(|| non_empty_var("AWS_REGION")),

            s3_endpoint: non_empty_var("MIGRATION_S3_ENDPOINT"),

            force_path_style: env::var("MIGRATION_S3_FORCE_PATH_STYLE")
                .map(|v| parse_flag(&v))
                .unwrap_or(default.force_path_style),

            verify_bucket: env::var("MIGRATION_VERIFY_BUCKET")
                .map(|v| parse_flag(&v))
                .unwrap_or(default.verify_bucket),

            staging_root: non_empty_var("MIGRATION_STAGING_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.staging_root),

            staging_prefix: non_empty_var("MIGRATION_STAGING_PREFIX")
                .unwrap_or(default.staging_prefix),

            db_connect_timeout: env::var("MIGRATION_DB_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.db_connect_timeout),

            ignore_missing: env::var("MIGRATION_IGNORE_MISSING")
                .map(|v| parse_flag(&v))
                .unwrap_or(default.ignore_missing),
        }
    }

    /// Config for tests: fixed region, no bucket probe, staging under `staging_root`.
    pub fn for_tests(staging_root: impl Into<PathBuf>) -> Self {
        Self {
            aws_region: Some("us-east-1".to_string()),
            verify_bucket: false,
            staging_root: staging_root.into(),
            db_connect_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value != "false" && value != "0" && value != "no"
}
