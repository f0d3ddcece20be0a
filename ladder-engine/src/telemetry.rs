//! Periodic counter polling
//!
//! While a session is active, a single worker task wakes up once per
//! interval, reads the engine's counters and publishes a [`DisplaySnapshot`].
//!
//! The worker stops when the session leaves the active state or when
//! [`TelemetryHandle::cancel`] is called. Both are only checked between
//! polls, at the sleep boundary: a poll that has started always completes,
//! so a snapshot is never built from a half-read counter line. Once `cancel`
//! returns, the worker has exited and nothing else will be published.
//!
//! Uptime is counted in active ticks: every tick taken while the session is
//! active adds one interval, whether or not its counter line parsed. Ticks
//! skipped during bring-up do not count.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::counters::{CounterSnapshot, DisplaySnapshot};
use crate::engine::NativeTunnelEngine;
use crate::presentation::SnapshotSender;
use crate::session::{SessionState, SharedState};

/// Default poll interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Telemetry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Time between counter reads
    pub interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Counter poller for one session
pub struct TelemetryLoop {
    engine: Arc<dyn NativeTunnelEngine>,
    state: Arc<SharedState>,
    snapshots: Arc<SnapshotSender>,
    config: TelemetryConfig,
}

impl TelemetryLoop {
    /// Create a poller reading from `engine` and publishing into `snapshots`
    pub fn new(
        engine: Arc<dyn NativeTunnelEngine>,
        state: Arc<SharedState>,
        snapshots: Arc<SnapshotSender>,
        config: TelemetryConfig,
    ) -> Self {
        Self {
            engine,
            state,
            snapshots,
            config,
        }
    }

    /// Start the worker task
    pub fn spawn(self) -> TelemetryHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let join = tokio::spawn(self.run(shutdown_rx));
        TelemetryHandle { shutdown_tx, join }
    }

    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut active_ticks: u32 = 0;
        log::debug!("Telemetry started (interval {:?})", self.config.interval);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = shutdown_rx.recv() => {
                    log::debug!("Telemetry cancelled");
                    break;
                }
            }

            match self.state.load() {
                SessionState::Active => {}
                // Spawned just before the controller flips to Active
                SessionState::Establishing => continue,
                state => {
                    log::debug!("Telemetry stopping, session is {}", state);
                    break;
                }
            }

            active_ticks = active_ticks.saturating_add(1);
            let uptime = self.config.interval.saturating_mul(active_ticks);
            self.poll(uptime.as_secs()).await;
        }
    }

    async fn poll(&self, uptime_secs: u64) {
        let line = match self.engine.read_counters().await {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Failed to read counters: {}", e);
                return;
            }
        };

        let counters = match line.parse::<CounterSnapshot>() {
            Ok(counters) => counters,
            Err(e) => {
                log::warn!("Ignoring counter line {:?}: {}", line.trim(), e);
                return;
            }
        };

        let snapshot = DisplaySnapshot::from_counters(&counters, uptime_secs);
        log::debug!(
            "Stats: rx={} tx={} down={:.1}B/s up={:.1}B/s",
            snapshot.bytes_in,
            snapshot.bytes_out,
            snapshot.download_rate,
            snapshot.upload_rate
        );
        self.snapshots.send_replace(Some(snapshot));
    }
}

/// Handle to a running telemetry worker
pub struct TelemetryHandle {
    shutdown_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl TelemetryHandle {
    /// Stop the worker and wait for it to exit
    pub async fn cancel(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.join.await {
            log::warn!("Telemetry worker failed: {}", e);
        }
    }

    /// Whether the worker has already exited
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
