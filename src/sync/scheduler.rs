//! Level-triggered sync scheduler
//!
//! Triggers only set a pending flag. A single worker task drains it, so any
//! number of triggers arriving during a pass collapse into one following pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::sync::synchronizer::CatalogSynchronizer;

#[derive(Default)]
struct RunState {
    pending: bool,
    running: bool,
}

struct Shared {
    state: Mutex<RunState>,
    wake: Notify,
    idle_tx: watch::Sender<bool>,
    idle_rx: watch::Receiver<bool>,
    passes: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle that requests a sync pass. Safe to call from store subscribers.
#[derive(Clone)]
pub struct SyncTrigger {
    shared: Arc<Shared>,
}

impl SyncTrigger {
    pub fn trigger(&self) {
        {
            let mut state = self.shared.lock();
            state.pending = true;
            self.shared.idle_tx.send_replace(false);
        }
        self.shared.wake.notify_one();
    }
}

pub struct SyncScheduler {
    trigger: SyncTrigger,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SyncScheduler {
    /// Start the worker on the current tokio runtime
    pub fn spawn(synchronizer: Arc<CatalogSynchronizer>) -> Self {
        let (idle_tx, idle_rx) = watch::channel(true);
        let shared = Arc::new(Shared {
            state: Mutex::new(RunState::default()),
            wake: Notify::new(),
            idle_tx,
            idle_rx,
            passes: AtomicU64::new(0),
        });
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_worker(synchronizer, shared.clone(), cancel.clone()));

        Self {
            trigger: SyncTrigger { shared },
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn trigger(&self) {
        self.trigger.trigger();
    }

    pub fn handle(&self) -> SyncTrigger {
        self.trigger.clone()
    }

    /// Number of completed passes
    pub fn passes(&self) -> u64 {
        self.trigger.shared.passes.load(Ordering::SeqCst)
    }

    /// Resolves once no pass is pending or running.
    ///
    /// Never resolves after `shutdown()` if a trigger was left pending.
    pub async fn wait_idle(&self) {
        let mut idle = self.trigger.shared.idle_rx.clone();
        loop {
            if *idle.borrow_and_update() {
                return;
            }
            if idle.changed().await.is_err() {
                return;
            }
        }
    }

    /// Stop the worker, abandoning any pass in progress
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::warn!("Sync worker ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_worker(
    synchronizer: Arc<CatalogSynchronizer>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    log::debug!("Sync worker started");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = shared.wake.notified() => {}
        }

        loop {
            {
                let mut state = shared.lock();
                if !state.pending {
                    state.running = false;
                    shared.idle_tx.send_replace(true);
                    break;
                }
                state.pending = false;
                state.running = true;
            }

            let report = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::debug!("Sync worker cancelled mid-pass");
                    return;
                }
                report = synchronizer.run() => report,
            };

            let pass = shared.passes.fetch_add(1, Ordering::SeqCst) + 1;
            log::debug!("Sync pass {} done: {:?}", pass, report);
        }
    }
    log::debug!("Sync worker stopped");
}
