//! Expiration Sweeper
//!
//! Background thread that evicts expired scalar entries.
//!
//! ## Responsibilities
//! - Wake up every `sweep_interval`
//! - Remove expired entries under one exclusive pass over the scalar table
//! - Report each eviction to the registered hook, outside the table lock
//!
//! ## Lifecycle
//! ```text
//!            start()                    stop()
//!  Stopped ──────────▶ Running ──────────────────▶ Stopped
//!                        │  ▲         (joins thread)
//!                   tick │  │ notify hook
//!                        ▼  │
//!                  remove_expired(now)
//! ```
//! Reads never check expiration; a value stays visible until the sweep that
//! follows its deadline removes it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use crossbeam::channel::{self, Sender};
use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::scalar::ScalarStore;

// =============================================================================
// Eviction Notifications
// =============================================================================

/// An entry removed by the sweeper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub key: String,
    pub value: Bytes,
    pub expires_at: Option<SystemTime>,
}

/// Callback invoked once per evicted entry
pub type EvictionHook = Arc<dyn Fn(&Eviction) + Send + Sync>;

/// Replaceable slot for the eviction hook
///
/// Cloning shares the slot, so a hook installed through any clone is seen by
/// a running sweeper.
#[derive(Clone, Default)]
pub struct EvictionNotifier {
    hook: Arc<RwLock<Option<EvictionHook>>>,
}

impl EvictionNotifier {
    /// Create a notifier with no hook
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or clear the hook
    pub fn set(&self, hook: Option<EvictionHook>) {
        *self.hook.write() = hook;
    }

    /// Whether a hook is installed
    pub fn is_set(&self) -> bool {
        self.hook.read().is_some()
    }

    /// Deliver one eviction
    ///
    /// A panicking hook is caught and logged. The hook handle is cloned out
    /// first so the slot lock is not held while user code runs.
    pub fn notify(&self, eviction: &Eviction) {
        let hook = match self.hook.read().clone() {
            Some(hook) => hook,
            None => return,
        };

        if panic::catch_unwind(AssertUnwindSafe(|| hook(eviction))).is_err() {
            tracing::warn!("Eviction hook panicked for key {:?}", eviction.key);
        }
    }
}

impl std::fmt::Debug for EvictionNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionNotifier")
            .field("hook_set", &self.is_set())
            .finish()
    }
}

/// Hook that logs each eviction at debug level
pub fn log_eviction() -> EvictionHook {
    Arc::new(|eviction: &Eviction| {
        tracing::debug!(
            key = %eviction.key,
            bytes = eviction.value.len(),
            "Evicted expired key"
        );
    })
}

// =============================================================================
// Sweep
// =============================================================================

/// Run one sweep at `now`, returning the number of evicted entries
///
/// The scalar table is locked exclusively once; the hook runs after the lock
/// is released.
pub fn sweep_once(scalars: &ScalarStore, notifier: &EvictionNotifier, now: SystemTime) -> usize {
    let removed = scalars.remove_expired(now);
    let count = removed.len();

    for (key, entry) in removed {
        notifier.notify(&Eviction {
            key,
            value: entry.value,
            expires_at: entry.expires_at,
        });
    }

    if count > 0 {
        tracing::debug!("Sweep evicted {} expired keys", count);
    }
    count
}

// =============================================================================
// Background Sweeper
// =============================================================================

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Periodic expiration sweeper
///
/// ## Concurrency:
/// - The worker thread owns a clone of the scalar store handle
/// - `start`/`stop` are serialized by the internal worker slot mutex
pub struct ExpirationSweeper {
    interval: Duration,
    worker: Mutex<Option<Worker>>,
}

impl ExpirationSweeper {
    const THREAD_NAME: &'static str = "exokv-sweeper";

    /// Create a stopped sweeper
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            worker: Mutex::new(None),
        }
    }

    /// Launch the sweep thread
    ///
    /// Returns `Ok(false)` if the sweeper is already running.
    pub fn start(&self, scalars: Arc<ScalarStore>, notifier: EvictionNotifier) -> Result<bool> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(false);
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let ticker = channel::tick(self.interval);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name(Self::THREAD_NAME.to_string())
            .spawn(move || {
                tracing::info!("Expiration sweeper started (interval {:?})", interval);
                loop {
                    crossbeam::select! {
                        recv(ticker) -> _ => {
                            sweep_once(&scalars, &notifier, SystemTime::now());
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
                tracing::info!("Expiration sweeper stopped");
            })?;

        *worker = Some(Worker { stop_tx, handle });
        Ok(true)
    }

    /// Signal the thread and wait for it to exit
    ///
    /// Returns `false` if the sweeper was not running.
    pub fn stop(&self) -> bool {
        let worker = match self.worker.lock().take() {
            Some(worker) => worker,
            None => return false,
        };

        // A send error means the thread is already gone
        let _ = worker.stop_tx.send(());
        if worker.handle.join().is_err() {
            tracing::error!("Expiration sweeper thread panicked");
        }
        true
    }

    /// Whether the sweep thread is running
    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Configured tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for ExpirationSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
