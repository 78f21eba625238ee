// ── Poll coordinator ──
//
// Periodically fetches every device with its status and republishes the
// merged snapshot. Exactly one fetch is in flight at a time: a refresh
// requested during a cycle awaits that cycle's result instead of starting
// another.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Snapshot, UpdateStatus};
use crate::source::DeviceSource;
use crate::stream::SnapshotStream;

type CycleResult = Result<Arc<Snapshot>, String>;
type InFlight = Shared<BoxFuture<'static, CycleResult>>;

/// Poll coordinator for one account.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    source: Arc<dyn DeviceSource>,
    interval: Duration,
    snapshot: watch::Sender<Arc<Snapshot>>,
    status: watch::Sender<UpdateStatus>,
    in_flight: Mutex<Option<InFlight>>,
    cancel: CancellationToken,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create an idle coordinator with an empty snapshot. Call
    /// [`first_refresh`](Self::first_refresh) and [`start`](Self::start)
    /// to begin polling.
    pub fn new(source: Arc<dyn DeviceSource>, interval: Duration) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        let (status, _) = watch::channel(UpdateStatus::default());

        Self {
            inner: Arc::new(CoordinatorInner {
                source,
                interval,
                snapshot,
                status,
                in_flight: Mutex::new(None),
                cancel: CancellationToken::new(),
                task: tokio::sync::Mutex::new(None),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run a poll cycle, or join the one already running.
    ///
    /// On failure the previous snapshot stays published and the error is
    /// recorded in [`update_status`](Self::update_status).
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        let cycle = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(cycle) = slot.as_ref() {
                debug!("joining in-flight refresh");
                cycle.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let cycle = inner.run_cycle().boxed().shared();
                *slot = Some(cycle.clone());
                cycle
            }
        };

        cycle
            .await
            .map_err(|message| CoreError::UpdateFailed { message })
    }

    /// Initial fetch at setup. Errors propagate so setup can refuse to start.
    pub async fn first_refresh(&self) -> Result<(), CoreError> {
        let snapshot = self.refresh().await?;
        info!(devices = snapshot.len(), "initial device refresh complete");
        Ok(())
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the interval task. A no-op if already running, if the
    /// interval is zero, or after [`shutdown`](Self::shutdown).
    pub async fn start(&self) {
        if self.inner.interval.is_zero() {
            debug!("scan interval is zero, not scheduling polls");
            return;
        }
        if self.inner.cancel.is_cancelled() {
            warn!("coordinator was shut down, not restarting polls");
            return;
        }

        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return;
        }
        let coordinator = self.clone();
        let cancel = self.inner.cancel.clone();
        *task = Some(tokio::spawn(poll_task(coordinator, cancel)));
        debug!(interval_secs = self.inner.interval.as_secs(), "poll task started");
    }

    /// Cancel the interval task and wait for it to exit. Terminal: a
    /// coordinator that was shut down never polls again.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!("coordinator shut down");
    }

    // ── Observation ──────────────────────────────────────────────

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshot.subscribe())
    }

    pub fn update_status(&self) -> UpdateStatus {
        self.inner.status.borrow().clone()
    }
}

impl CoordinatorInner {
    async fn run_cycle(self: Arc<Self>) -> CycleResult {
        let result = self.source.fetch_devices().await;

        // Clear before publishing so a refresh requested by a subscriber
        // reacting to this snapshot starts a new cycle.
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match result {
            Ok(records) => {
                let now = Utc::now();
                let snapshot = Arc::new(Snapshot::from_records(records, now));
                self.snapshot.send_replace(Arc::clone(&snapshot));
                self.status.send_modify(|s| {
                    s.last_success = Some(now);
                    s.last_error = None;
                    s.consecutive_failures = 0;
                });
                debug!(devices = snapshot.len(), "device refresh complete");
                Ok(snapshot)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %e, "device refresh failed, keeping previous snapshot");
                self.status.send_modify(|s| {
                    s.last_error = Some(message.clone());
                    s.consecutive_failures = s.consecutive_failures.saturating_add(1);
                });
                Err(message)
            }
        }
    }
}

// ── Background task ──────────────────────────────────────────────

/// Refresh on every tick until cancelled. A failing cycle does not
/// disturb the schedule.
async fn poll_task(coordinator: Coordinator, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(coordinator.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = coordinator.refresh() => {
                        if let Err(e) = result {
                            debug!(error = %e, "scheduled refresh failed");
                        }
                    }
                }
            }
        }
    }

    debug!("poll task exiting");
}
