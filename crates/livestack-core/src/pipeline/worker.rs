use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::{LiveStackError, Result};

use super::config::PipelineConfig;
use super::ingest::{Collaborators, Ingestor};
use super::subscribers::{SubscriptionId, Subscribers};
use super::types::Outcome;

/// How often `wait_idle` re-checks the worker state while waiting.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of the ingestion worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::Stopping => write!(f, "Stopping"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// State shared between the pipeline handle and its worker thread.
struct Shared {
    state: Mutex<WorkerState>,
    stop: AtomicBool,
    pending: Mutex<usize>,
    drained: Condvar,
}

impl Shared {
    /// Count one dequeued item as finished; returns how many remain.
    fn finish_item(&self) -> usize {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.drained.notify_all();
        }
        *pending
    }
}

/// A live-stacking pipeline: a queue of submitted paths drained in order by
/// a single background worker, plus the registry of preview subscribers.
///
/// `submit`, `subscribe` and `unsubscribe` may be called from any thread.
/// `stop` is cooperative: the item being processed always runs to
/// completion, and the worker exits at the next dequeue boundary.
pub struct Pipeline {
    config: PipelineConfig,
    queue: mpsc::Sender<PathBuf>,
    shared: Arc<Shared>,
    subscribers: Arc<Subscribers>,
    startup: Mutex<Option<(mpsc::Receiver<PathBuf>, Ingestor)>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Pipeline {
    /// Create a pipeline with the default registration and smoothing.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let collaborators = Collaborators::from_config(&config);
        Self::with_collaborators(config, collaborators)
    }

    /// Create a pipeline, opening its storage and ledger. The worker is not
    /// started until [`Pipeline::start`].
    pub fn with_collaborators(config: PipelineConfig, collaborators: Collaborators) -> Result<Self> {
        let subscribers = Arc::new(Subscribers::new());
        let ingestor = Ingestor::open(&config, collaborators, Arc::clone(&subscribers))?;
        info!(
            storage = %config.storage_dir.display(),
            output = %config.output_dir.display(),
            processed = ingestor.ledger().len(),
            "Pipeline opened"
        );

        let (queue, receiver) = mpsc::channel();
        Ok(Self {
            config,
            queue,
            shared: Arc::new(Shared {
                state: Mutex::new(WorkerState::Idle),
                stop: AtomicBool::new(false),
                pending: Mutex::new(0),
                drained: Condvar::new(),
            }),
            subscribers,
            startup: Mutex::new(Some((receiver, ingestor))),
            handle: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.shared.state.lock()
    }

    /// Start the worker thread. Does nothing unless the pipeline is idle.
    pub fn start(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if *state != WorkerState::Idle {
            return Ok(());
        }
        let Some((receiver, ingestor)) = self.startup.lock().take() else {
            return Ok(());
        };

        let shared = Arc::clone(&self.shared);
        let timeout = self.config.dequeue_timeout();
        let handle = std::thread::Builder::new()
            .name("livestack-worker".into())
            .spawn(move || worker_loop(receiver, ingestor, shared, timeout))
            .map_err(|e| {
                *state = WorkerState::Stopped;
                LiveStackError::Pipeline(format!("failed to spawn worker thread: {e}"))
            })?;

        *self.handle.lock() = Some(handle);
        *state = WorkerState::Running;
        Ok(())
    }

    /// Queue a source path. Never blocks on processing.
    pub fn submit(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        *self.shared.pending.lock() += 1;
        if let Err(mpsc::SendError(path)) = self.queue.send(path) {
            self.shared.finish_item();
            warn!(path = %path.display(), "Worker has shut down; path dropped");
        }
    }

    /// Ask the worker to exit after its current item and wait for it.
    ///
    /// Items still queued are discarded unprocessed and stop counting
    /// towards [`Pipeline::pending`].
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            let current = *state;
            match current {
                WorkerState::Running => *state = WorkerState::Stopping,
                WorkerState::Idle => {
                    self.startup.lock().take();
                    *state = WorkerState::Stopped;
                    drop(state);
                    self.discard_pending();
                    return;
                }
                WorkerState::Stopping | WorkerState::Stopped => {}
            }
            // Set under the state lock: anyone who sees `Stopping` also
            // sees the flag.
            self.shared.stop.store(true, Ordering::Release);
        }

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!("Ingestion worker panicked");
            }
        }

        *self.shared.state.lock() = WorkerState::Stopped;
        self.discard_pending();
    }

    fn discard_pending(&self) {
        let mut pending = self.shared.pending.lock();
        if *pending > 0 {
            debug!(discarded = *pending, "Queued items dropped on stop");
        }
        *pending = 0;
        self.shared.drained.notify_all();
    }

    /// Block until every submitted path has been dequeued and finished, or
    /// the worker is no longer running.
    pub fn wait_idle(&self) {
        let mut pending = self.shared.pending.lock();
        while *pending > 0 {
            if self.state() != WorkerState::Running {
                return;
            }
            self.shared
                .drained
                .wait_for(&mut pending, IDLE_POLL_INTERVAL);
        }
    }

    /// Submitted paths not yet finished.
    pub fn pending(&self) -> usize {
        *self.shared.pending.lock()
    }

    /// Register a channel that receives the path of every new light preview.
    pub fn subscribe(&self) -> (SubscriptionId, mpsc::Receiver<PathBuf>) {
        self.subscribers.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    receiver: mpsc::Receiver<PathBuf>,
    mut ingestor: Ingestor,
    shared: Arc<Shared>,
    timeout: Duration,
) {
    info!("Ingestion worker started");

    while !shared.stop.load(Ordering::Acquire) {
        let path = match receiver.recv_timeout(timeout) {
            Ok(path) => path,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| ingestor.ingest(&path)));
        match result {
            Ok(Ok(Outcome::Skipped)) => {}
            Ok(Ok(outcome)) => debug!(path = %path.display(), ?outcome, "Item processed"),
            Ok(Err(e)) => error!(path = %path.display(), error = %e, "Failed to process frame"),
            Err(_) => error!(path = %path.display(), "Processing panicked; item abandoned"),
        }

        let remaining = shared.finish_item();
        debug!(
            remaining,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Items remaining"
        );
    }

    info!("Ingestion worker stopped");
}
