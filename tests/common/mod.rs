#![allow(dead_code)]

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_types::body::SdkBody;
use bytes::Bytes;
use http_body::Frame;
use s3_migration_runner::models::ApplyOutcome;
use s3_migration_runner::services::migrator::{MigrationEngine, MigrationEngineFactory};
use s3_migration_runner::services::storage::{ObjectPage, ObjectStore, ObjectStoreConnector};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

pub const BUCKET: &str = "migrations-bucket";

/// Single-bucket object store with S3-like lexicographic, paginated listing.
pub struct InMemoryObjectStore {
    objects: BTreeMap<String, Vec<u8>>,
    page_size: usize,
    failing_gets: HashSet<String>,
    broken_bodies: HashSet<String>,
    failing_page: Option<usize>,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            page_size: 1000,
            failing_gets: HashSet::new(),
            broken_bodies: HashSet::new(),
            failing_page: None,
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_object(mut self, key: &str, body: &[u8]) -> Self {
        self.objects.insert(key.to_string(), body.to_vec());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn failing_get(mut self, key: &str) -> Self {
        self.failing_gets.insert(key.to_string());
        self
    }

    /// Serves the first chunk of the body, then fails the stream.
    pub fn broken_body(mut self, key: &str) -> Self {
        self.broken_bodies.insert(key.to_string());
        self
    }

    /// Fails the listing request for the given 1-based page number.
    pub fn failing_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if bucket != BUCKET {
            bail!("NoSuchBucket: {}", bucket);
        }
        if self.failing_page == Some(call) {
            bail!("simulated listing failure");
        }

        let start: usize = match continuation_token {
            Some(token) => token.parse()?,
            None => 0,
        };
        let matching: Vec<&String> = self
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .collect();

        let end = (start + self.page_size).min(matching.len());
        let keys = matching[start..end].iter().map(|k| k.to_string()).collect();
        let next_continuation_token = (end < matching.len()).then(|| end.to_string());

        Ok(ObjectPage {
            keys,
            next_continuation_token,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if bucket != BUCKET {
            bail!("NoSuchBucket: {}", bucket);
        }
        if self.failing_gets.contains(key) {
            bail!("simulated fetch failure");
        }
        if self.broken_bodies.contains(key) {
            return Ok(ByteStream::new(SdkBody::from_body_1_x(ResetBody::default())));
        }
        let body = self
            .objects
            .get(key)
            .ok_or_else(|| anyhow!("NoSuchKey: {}", key))?;
        Ok(ByteStream::from(body.clone()))
    }
}

/// Body that yields one chunk and then a connection reset.
#[derive(Default)]
struct ResetBody {
    sent: bool,
}

impl http_body::Body for ResetBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        if self.sent {
            return Poll::Ready(Some(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))));
        }
        self.sent = true;
        Poll::Ready(Some(Ok(Frame::data(Bytes::from_static(b"CREATE TABLE")))))
    }
}

pub struct StaticConnector {
    store: Arc<InMemoryObjectStore>,
    pub connects: AtomicUsize,
}

impl StaticConnector {
    pub fn new(store: Arc<InMemoryObjectStore>) -> Self {
        Self {
            store,
            connects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ObjectStoreConnector for StaticConnector {
    async fn connect(&self, _bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone() as Arc<dyn ObjectStore>)
    }
}

pub struct FailingConnector;

#[async_trait]
impl ObjectStoreConnector for FailingConnector {
    async fn connect(&self, _bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        bail!("no credentials available")
    }
}

#[derive(Debug, Clone)]
pub enum EngineBehavior {
    Apply,
    Fail(String),
    FailToOpen(String),
}

/// What the engine saw when it was opened.
#[derive(Debug, Clone)]
pub struct OpenRecord {
    pub dir: PathBuf,
    pub db_url: String,
    pub files: BTreeMap<String, Vec<u8>>,
}

/// Engine factory that snapshots the staged directory on open.
pub struct RecordingEngineFactory {
    behavior: EngineBehavior,
    pub opened: Mutex<Vec<OpenRecord>>,
    pub closed: Arc<AtomicUsize>,
}

impl RecordingEngineFactory {
    pub fn new(behavior: EngineBehavior) -> Self {
        Self {
            behavior,
            opened: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn records(&self) -> Vec<OpenRecord> {
        self.opened.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MigrationEngineFactory for RecordingEngineFactory {
    async fn open(
        &self,
        migrations_dir: &Path,
        db_url: &str,
    ) -> Result<Box<dyn MigrationEngine>> {
        let files = read_dir_contents(migrations_dir);
        let pending = files.len();
        self.opened.lock().unwrap().push(OpenRecord {
            dir: migrations_dir.to_path_buf(),
            db_url: db_url.to_string(),
            files,
        });

        if let EngineBehavior::FailToOpen(message) = &self.behavior {
            bail!("{}", message);
        }

        Ok(Box::new(FakeEngine {
            behavior: self.behavior.clone(),
            pending,
            closed: self.closed.clone(),
        }))
    }
}

struct FakeEngine {
    behavior: EngineBehavior,
    pending: usize,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl MigrationEngine for FakeEngine {
    async fn apply_pending(&mut self) -> Result<ApplyOutcome> {
        match &self.behavior {
            EngineBehavior::Fail(message) => bail!("{}", message),
            _ if self.pending == 0 => Ok(ApplyOutcome::NoChange),
            _ => Ok(ApplyOutcome::Applied {
                count: self.pending,
            }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn read_dir_contents(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            assert!(entry.file_type().unwrap().is_file());
            (
                entry.file_name().to_string_lossy().into_owned(),
                std::fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}

pub fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}
