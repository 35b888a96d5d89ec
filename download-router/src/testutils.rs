use crate::fetcher::{ArtifactFetcher, ArtifactStream, FetchError};
use async_trait::async_trait;
use build_directory::{BuildDirectory, BuildRecord, DirectoryError, OrchestratorError};
use futures_util::{Stream, StreamExt, stream};
use hyper::body::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

/// In-memory directory counting every lookup.
pub struct FakeDirectory {
    builds: HashMap<String, BuildRecord>,
    failing: bool,
    calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(builds: Vec<BuildRecord>) -> Self {
        FakeDirectory {
            builds: builds.into_iter().map(|b| (b.name.clone(), b)).collect(),
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A directory whose orchestrator is unreachable.
    pub fn failing() -> Self {
        FakeDirectory {
            failing: true,
            ..FakeDirectory::new(vec![])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BuildDirectory for FakeDirectory {
    async fn resolve_build(&self, id: &str) -> Result<BuildRecord, DirectoryError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing {
            return Err(OrchestratorError::RetriesExceeded.into());
        }
        self.builds
            .get(id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))
    }
}

/// Artifact store serving fixed chunks per URL and recording every request.
/// Tracks how many of the streams it handed out are still alive.
#[derive(Default)]
pub struct FakeFetcher {
    artifacts: HashMap<String, Vec<&'static str>>,
    interrupt_after_first_chunk: bool,
    requests: Mutex<Vec<(String, String)>>,
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact(mut self, url: &str, chunks: &[&'static str]) -> Self {
        self.artifacts.insert(url.to_string(), chunks.to_vec());
        self
    }

    pub fn interrupting(mut self) -> Self {
        self.interrupt_after_first_chunk = true;
        self
    }

    /// `(url, credential)` pairs in request order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().clone()
    }

    pub fn streams_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Streams handed out and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.streams_opened() - self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactFetcher for FakeFetcher {
    async fn stream(&self, url: &str, credential: &str) -> Result<ArtifactStream, FetchError> {
        self.requests
            .lock()
            .push((url.to_string(), credential.to_string()));

        let chunks = self.artifacts.get(url).ok_or(FetchError::NotFound)?;
        let mut items: Vec<Result<Bytes, FetchError>> = chunks
            .iter()
            .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
            .collect();
        if self.interrupt_after_first_chunk {
            items.truncate(1);
            items.push(Err(FetchError::Interrupted("connection reset".into())));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::pin(ReleaseOnDrop {
            inner: stream::iter(items),
            released: self.released.clone(),
        }))
    }
}

/// Counts itself as released when the consumer drops it.
struct ReleaseOnDrop<S> {
    inner: S,
    released: Arc<AtomicUsize>,
}

impl<S: Stream + Unpin> Stream for ReleaseOnDrop<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<S> Drop for ReleaseOnDrop<S> {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
