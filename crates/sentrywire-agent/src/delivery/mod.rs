//! Delivery subsystem: background queue drain plus the retrying collector
//! client.
//!
//! Capture threads only enqueue; the worker spawned here is the single place
//! network I/O and retry back-off sleeps happen.

pub mod client;

pub use client::{CollectorClient, DeliveryError};

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::pipeline::PipelineStats;

/// Drains encoded wire lines off the queue and ships each through the
/// retrying client. One consumer; the channel's senders live in the capture
/// gateways.
pub(crate) struct DeliveryWorker {
    client: Arc<CollectorClient>,
    stats: Arc<PipelineStats>,
}

impl DeliveryWorker {
    pub(crate) fn new(client: Arc<CollectorClient>, stats: Arc<PipelineStats>) -> Self {
        Self { client, stats }
    }

    /// Spawn the drain task. Runs until every sender is dropped.
    pub(crate) fn run(self, mut rx: mpsc::Receiver<String>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                match self.client.send_event_line(&line).await {
                    Ok(()) => {
                        self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        // Terminal failure: the event is dropped, not requeued.
                        self.stats.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "event dropped after delivery failure");
                    }
                }
            }
            debug!("delivery worker shut down");
        })
    }
}
