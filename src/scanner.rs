//! Continuous scan loop and its start/stop lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::console::transport::ConsoleWriter;
use crate::network::radio::Radio;
use crate::network::snapshot::{Snapshot, SnapshotStore};

/// Pause between the end of one scan cycle and the start of the next
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(1700);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

/// Result of asking the controller to start scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new scan loop was launched
    Started,
    /// A scan loop is already running; nothing was launched
    AlreadyRunning,
    /// The previous loop was told to stop but is still finishing its scan;
    /// still a running loop as far as the console is concerned
    Stopping,
}

/// State shared between the controller and its scan loop task
struct ScanContext {
    radio: Arc<dyn Radio>,
    store: Arc<SnapshotStore>,
    console: ConsoleWriter,
    interval: Duration,
    /// Set by `start`, cleared only by the exiting loop
    running: AtomicBool,
}

/// Owns the single background scan loop.
///
/// At most one loop exists at a time: `start` claims the running flag with a
/// compare-exchange before spawning, and the loop clears it on its way out.
/// `stop` only cancels the loop's token; a scan already in progress runs to
/// completion and the loop exits at the next check.
pub struct ScanController {
    ctx: Arc<ScanContext>,
    cancel: Mutex<CancellationToken>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ScanController {
    pub fn new(
        radio: Arc<dyn Radio>,
        store: Arc<SnapshotStore>,
        console: ConsoleWriter,
        interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        cancel.cancel();

        Self {
            ctx: Arc::new(ScanContext {
                radio,
                store,
                console,
                interval,
                running: AtomicBool::new(false),
            }),
            cancel: Mutex::new(cancel),
            task: Mutex::new(None),
        }
    }

    /// Launch the scan loop unless one is already running
    pub fn start(&self) -> StartOutcome {
        let mut cancel = lock(&self.cancel);

        if self
            .ctx
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return if cancel.is_cancelled() {
                debug!("Scan start ignored, previous loop is still stopping");
                StartOutcome::Stopping
            } else {
                StartOutcome::AlreadyRunning
            };
        }

        *cancel = CancellationToken::new();
        let handle = tokio::spawn(scan_loop(Arc::clone(&self.ctx), cancel.clone()));
        drop(cancel);

        // A previous handle belongs to a loop that has already exited
        *lock(&self.task) = Some(handle);

        info!(
            "Continuous scan started via {} every {:?}",
            self.ctx.radio.name(),
            self.ctx.interval
        );
        StartOutcome::Started
    }

    /// Ask the scan loop to stop. Safe to call at any time.
    ///
    /// Returns `true` if this call is the one that requested the stop.
    pub fn stop(&self) -> bool {
        let cancel = lock(&self.cancel);
        let requested = self.ctx.running.load(Ordering::Acquire) && !cancel.is_cancelled();
        cancel.cancel();
        if requested {
            info!("Scan stop requested");
        }
        requested
    }

    pub fn state(&self) -> ScanState {
        if self.ctx.running.load(Ordering::Acquire) {
            ScanState::Scanning
        } else {
            ScanState::Idle
        }
    }

    /// Stop the loop and wait for it to exit
    pub async fn shutdown(&self) {
        self.stop();
        let handle = lock(&self.task).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Scan loop ended abnormally: {}", e);
            }
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.ctx.store
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the running flag when the loop exits, including by panic
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn scan_loop(ctx: Arc<ScanContext>, cancel: CancellationToken) {
    let _running = RunningGuard(&ctx.running);

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let started = Instant::now();
        let snapshot = run_cycle(ctx.radio.as_ref(), &ctx.store).await;
        ctx.console.write(render(&snapshot));
        debug!(
            "Scan cycle: {} access points in {:?}",
            snapshot.len(),
            started.elapsed()
        );

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(ctx.interval) => {}
        }
    }

    info!("Continuous scan stopped");
}

/// One blocking scan followed by a wholesale snapshot replace.
///
/// A failed scan installs an empty snapshot; the caller carries on.
pub async fn run_cycle(radio: &dyn Radio, store: &SnapshotStore) -> Arc<Snapshot> {
    match radio.scan().await {
        Ok(raw) => store.replace_raw(&raw),
        Err(e) => {
            warn!("Scan via {} failed: {}", radio.name(), e);
            store.clear();
            store.current()
        }
    }
}

/// Console lines for every record of a snapshot, in scan order
pub fn render(snapshot: &Snapshot) -> String {
    snapshot.iter().map(|record| format!("{record}\n")).collect()
}
