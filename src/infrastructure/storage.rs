use crate::config::RunnerConfig;
use crate::services::storage::{ObjectStore, ObjectStoreConnector, S3ObjectStore};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use std::sync::Arc;
use tracing::info;

/// Builds S3 sessions from explicit configuration. Credentials come from the
/// default provider chain (the Lambda execution role in production).
pub struct S3Connector {
    region: Option<String>,
    endpoint_url: Option<String>,
    force_path_style: bool,
    verify_bucket: bool,
}

impl S3Connector {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            region: config.aws_region.clone(),
            endpoint_url: config.s3_endpoint.clone(),
            force_path_style: config.force_path_style,
            verify_bucket: config.verify_bucket,
        }
    }

    async fn build_client(&self) -> Result<aws_sdk_s3::Client> {
        let region = self
            .region
            .clone()
            .ok_or_else(|| anyhow!("no AWS region configured (set MIGRATION_AWS_REGION)"))?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(endpoint_url) = &self.endpoint_url {
            info!("☁️  Using custom S3 endpoint: {}", endpoint_url);
            loader = loader.endpoint_url(endpoint_url);
        }
        let aws_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(self.force_path_style)
            .build();

        Ok(aws_sdk_s3::Client::from_conf(s3_config))
    }
}

#[async_trait]
impl ObjectStoreConnector for S3Connector {
    async fn connect(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let client = self.build_client().await?;

        if self.verify_bucket {
            client
                .head_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| anyhow!("bucket '{}' is not reachable: {}", bucket, DisplayErrorContext(&e)))?;
            info!("✅ Bucket '{}' is reachable", bucket);
        }

        Ok(Arc::new(S3ObjectStore::new(client)))
    }
}
