//! Handoff of display snapshots to the presentation layer
//!
//! The telemetry worker publishes into a single-slot [`watch`] channel: a new
//! value replaces the previous one and the worker never waits for a reader.
//! A slow UI simply sees fewer, newer snapshots.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::counters::DisplaySnapshot;

/// Publishing side of the snapshot slot
pub type SnapshotSender = watch::Sender<Option<DisplaySnapshot>>;

/// Reading side of the snapshot slot
pub type SnapshotReceiver = watch::Receiver<Option<DisplaySnapshot>>;

/// Create an empty snapshot slot
pub fn snapshot_channel() -> (SnapshotSender, SnapshotReceiver) {
    watch::channel(None)
}

/// Something that can show the status text to the user
pub trait PresentationBridge: Send + Sync {
    /// Show the formatted status text
    fn render(&self, text: &str);
}

/// Presentation that writes status text to the log
pub struct LogPresentation;

impl PresentationBridge for LogPresentation {
    fn render(&self, text: &str) {
        for line in text.lines() {
            log::info!("{}", line);
        }
    }
}

/// Render every new snapshot until the publishing side goes away
pub fn spawn_renderer(
    bridge: Arc<dyn PresentationBridge>,
    mut receiver: SnapshotReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            let latest = *receiver.borrow_and_update();
            if let Some(snapshot) = latest {
                bridge.render(&snapshot.to_string());
            }
        }
        log::debug!("Snapshot publisher closed, renderer exiting");
    })
}
