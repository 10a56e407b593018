use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::sync::Arc;

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// Token for the next page; `None` once the listing is exhausted.
    pub next_continuation_token: Option<String>,
}

/// Read access to an object store: paginated listing and whole-object fetch.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ByteStream>;
}

/// Opens an authenticated object store session for a bucket.
#[async_trait]
pub trait ObjectStoreConnector: Send + Sync {
    async fn connect(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>>;
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage> {
        let res = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        let keys = res
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| object.key)
            .collect();

        // S3 may return a token on the last page; only a truncated page has a successor.
        let next_continuation_token = if res.is_truncated.unwrap_or(false) {
            match res.next_continuation_token {
                Some(token) => Some(token),
                None => return Err(anyhow!("truncated listing without continuation token")),
            }
        } else {
            None
        };

        Ok(ObjectPage {
            keys,
            next_continuation_token,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let res = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;
        Ok(res.body)
    }
}
