//! Copies a prefix of an object store into a private local directory so a
//! file-based migration engine can read it.
//!
//! Staging is all-or-nothing: the first listing, fetch or write failure
//! aborts the pass and removes the directory together with whatever was
//! already written.

use crate::config::RunnerConfig;
use crate::error::StagingError;
use crate::models::MigrationSource;
use crate::services::storage::ObjectStore;
use crate::utils::validation::staged_file_name;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Where staging directories are created.
#[derive(Debug, Clone)]
pub struct StagingOptions {
    pub root: PathBuf,
    pub dir_prefix: String,
}

impl From<&RunnerConfig> for StagingOptions {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            root: config.staging_root.clone(),
            dir_prefix: config.staging_prefix.clone(),
        }
    }
}

/// A staged migration set. The directory is removed by [`cleanup`], or on
/// drop if the owner never gets that far.
///
/// [`cleanup`]: StagedMigrations::cleanup
#[derive(Debug)]
pub struct StagedMigrations {
    dir: TempDir,
    files: Vec<String>,
}

impl StagedMigrations {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Staged file names, in listing order.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Recursively removes the staging directory.
    pub fn cleanup(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Stages every object under `source` into a new, randomly named directory.
///
/// Keys ending in `/` are folder placeholders and produce no file.
pub async fn stage(
    store: &dyn ObjectStore,
    source: &MigrationSource,
    options: &StagingOptions,
) -> Result<StagedMigrations, StagingError> {
    let dir = tempfile::Builder::new()
        .prefix(&options.dir_prefix)
        .tempdir_in(&options.root)
        .map_err(|e| StagingError::io(&options.root, e))?;

    info!("📂 Staging {} into {}", source, dir.path().display());

    // file name -> key it was staged from
    let mut staged: HashMap<String, String> = HashMap::new();
    let mut files = Vec::new();
    let mut continuation_token = None;
    let mut page_number = 0usize;
    let mut total_bytes = 0u64;

    loop {
        page_number += 1;
        let page = store
            .list_objects_page(&source.bucket, &source.prefix, continuation_token.take())
            .await
            .map_err(|e| {
                StagingError::transport(
                    format!("failed to list {} (page {})", source, page_number),
                    e,
                )
            })?;

        debug!("Listing page {} returned {} keys", page_number, page.keys.len());

        for key in page.keys {
            let Some(name) = staged_file_name(&key)? else {
                debug!("   - Skipping folder placeholder '{}'", key);
                continue;
            };

            if let Some(first_key) = staged.get(name) {
                return Err(StagingError::DuplicateFileName {
                    name: name.to_string(),
                    first_key: first_key.clone(),
                    second_key: key.clone(),
                });
            }

            let path = dir.path().join(name);
            let size = download_object(store, &source.bucket, &key, &path).await?;
            debug!("   - Staged '{}' ({} bytes)", key, size);

            total_bytes += size;
            staged.insert(name.to_string(), key.clone());
            files.push(name.to_string());
        }

        match page.next_continuation_token {
            Some(token) => continuation_token = Some(token),
            None => break,
        }
    }

    info!(
        "✅ Staged {} files ({} bytes) from {} listing pages",
        files.len(),
        total_bytes,
        page_number
    );

    Ok(StagedMigrations { dir, files })
}

async fn download_object(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    path: &Path,
) -> Result<u64, StagingError> {
    let mut body = store.get_object(bucket, key).await.map_err(|e| {
        StagingError::transport(format!("failed to fetch s3://{}/{}", bucket, key), e)
    })?;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| StagingError::io(path, e))?;

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            StagingError::transport(
                format!("failed to read body of s3://{}/{}", bucket, key),
                anyhow::Error::new(e),
            )
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|e| StagingError::io(path, e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| StagingError::io(path, e))?;
    file.sync_all().await.map_err(|e| StagingError::io(path, e))?;

    Ok(written)
}
