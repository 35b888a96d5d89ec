use crate::metrics_defs::{CACHE_MISS, SYNC_BUILDS, SYNC_DURATION, SYNC_FAILURES};
use crate::orchestrator::{OrchestratorClient, OrchestratorError};
use crate::types::{BuildRecord, PlatformType};
use crate::unknown_builds::{UNKNOWN_BUILD_TTL, UnknownBuilds};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared::{counter, histogram};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(thiserror::Error, Debug)]
pub enum DirectoryError {
    #[error("build {0} not found")]
    NotFound(String),
    #[error("no build type found for build {0}")]
    NoBuildType(String),
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
}

/// Read access to the builds known to the orchestration platform.
#[async_trait]
pub trait BuildDirectory: Send + Sync {
    /// Resolves a build by name. Unknown builds fail with `DirectoryError::NotFound`.
    async fn resolve_build(&self, id: &str) -> Result<BuildRecord, DirectoryError>;

    fn classify_build_type(&self, build: &BuildRecord) -> Result<PlatformType, DirectoryError> {
        PlatformType::classify(build).ok_or_else(|| DirectoryError::NoBuildType(build.name.clone()))
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("another load operation is in progress")]
    ConcurrentLoad(#[from] AcquireError),
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
    #[error("the refresh worker has stopped")]
    WorkerStopped,
}

#[derive(Debug)]
pub enum Command {
    // Trigger a full refresh outside of the normal interval.
    // The worker replies once the refresh attempt finishes.
    Refresh(oneshot::Sender<Result<(), LoadError>>),
    // Stop the refresh worker
    Shutdown,
}

struct DirectoryInner {
    builds: Arc<BuildCache>,
    tx: mpsc::Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Build directory backed by the orchestrator, with a cache kept current by a
/// background worker. Cloning is cheap and shares the cache and the worker.
#[derive(Clone)]
pub struct Directory {
    inner: Arc<DirectoryInner>,
}

impl Directory {
    /// Spawns the refresh worker. Must be called from within a tokio runtime.
    pub fn new(orchestrator: OrchestratorClient, refresh_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<Command>(64);

        let builds = Arc::new(BuildCache::new(orchestrator, refresh_interval));

        // All snapshot loading happens on this task.
        let builds_clone = builds.clone();
        let handle = tokio::spawn(async move {
            builds_clone.run_worker(rx).await;
        });

        Directory {
            inner: Arc::new(DirectoryInner {
                builds,
                tx,
                handle: Mutex::new(Some(handle)),
            }),
        }
    }

    /// Reloads every build now and waits for the result.
    pub async fn refresh(&self) -> Result<(), LoadError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .tx
            .send(Command::Refresh(reply_tx))
            .await
            .map_err(|_| LoadError::WorkerStopped)?;
        reply_rx.await.map_err(|_| LoadError::WorkerStopped)?
    }

    /// Stops the refresh worker. Cached builds remain readable.
    pub async fn shutdown(&self) {
        let _ = self.inner.tx.send(Command::Shutdown).await;
        let handle = self.inner.handle.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "build directory worker panicked");
        }
    }
}

#[async_trait]
impl BuildDirectory for Directory {
    async fn resolve_build(&self, id: &str) -> Result<BuildRecord, DirectoryError> {
        self.inner.builds.resolve(id).await
    }

    fn is_ready(&self) -> bool {
        self.inner.builds.ready.load(Ordering::Relaxed)
    }
}

/// The cached view of the orchestrator's builds. Used internally by the Directory.
struct BuildCache {
    orchestrator: OrchestratorClient,
    builds: RwLock<HashMap<String, Arc<BuildRecord>>>,
    unknown: UnknownBuilds,
    update_lock: Semaphore,
    // Used by the readiness probe. Set once the first snapshot has been loaded.
    ready: AtomicBool,
    refresh_interval: Duration,
}

impl BuildCache {
    fn new(orchestrator: OrchestratorClient, refresh_interval: Duration) -> Self {
        BuildCache {
            orchestrator,
            builds: RwLock::new(HashMap::new()),
            unknown: UnknownBuilds::new(UNKNOWN_BUILD_TTL),
            update_lock: Semaphore::new(1),
            ready: AtomicBool::new(false),
            refresh_interval,
        }
    }

    async fn resolve(&self, id: &str) -> Result<BuildRecord, DirectoryError> {
        if let Some(build) = self.builds.read().get(id) {
            return Ok(BuildRecord::clone(build));
        }

        if self.unknown.recently_missing(id) {
            return Err(DirectoryError::NotFound(id.to_string()));
        }

        // Builds created since the last snapshot are fetched directly.
        counter!(CACHE_MISS).increment(1);
        match self.orchestrator.get_build(id).await? {
            Some(build) => {
                self.builds
                    .write()
                    .insert(build.name.clone(), Arc::new(build.clone()));
                Ok(build)
            }
            None => {
                self.unknown.record_miss(id);
                Err(DirectoryError::NotFound(id.to_string()))
            }
        }
    }

    /// Loads a snapshot immediately, then on every interval tick and whenever a
    /// Refresh command arrives, until Shutdown is received or all senders are gone.
    async fn run_worker(&self, mut rx: mpsc::Receiver<Command>) {
        let mut interval = tokio::time::interval(self.refresh_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.load_snapshot().await {
                        tracing::error!(error = %e, "failed to refresh builds, keeping previous snapshot");
                    }
                }
                cmd = rx.recv() => match cmd {
                    Some(Command::Refresh(reply)) => {
                        let result = self.load_snapshot().await;
                        let _ = reply.send(result);
                    }
                    Some(Command::Shutdown) | None => {
                        tracing::info!("build directory worker stopped");
                        break;
                    }
                },
            }
        }
    }

    /// Replaces the cached builds with a full listing from the orchestrator.
    async fn load_snapshot(&self) -> Result<(), LoadError> {
        // Hold permit for the duration of this function
        let _permit = self.get_permit().await?;

        let started = Instant::now();
        let listing = self.orchestrator.list_builds().await.inspect_err(|_| {
            counter!(SYNC_FAILURES).increment(1);
        })?;
        histogram!(SYNC_DURATION).record(started.elapsed().as_secs_f64());
        histogram!(SYNC_BUILDS).record(listing.len() as f64);

        self.unknown
            .forget_listed(listing.iter().map(|build| build.name.as_str()));
        let snapshot: HashMap<_, _> = listing
            .into_iter()
            .map(|build| (build.name.clone(), Arc::new(build)))
            .collect();

        tracing::info!(builds = snapshot.len(), "loaded build snapshot");
        *self.builds.write() = snapshot;
        self.ready.store(true, Ordering::Relaxed);

        Ok(())
    }

    /// Guard that ensures only one load operation is in progress at a time.
    async fn get_permit(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.update_lock.acquire().await
    }
}
