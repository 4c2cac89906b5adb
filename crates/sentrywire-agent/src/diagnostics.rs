//! Diagnostic/status buffering and the periodic flush loop.
//!
//! This path is deliberately decoupled from event delivery: diagnostic noise
//! can neither block nor be blocked by the event queue. Messages accumulate
//! in memory and a timer-driven task drains them through the same retrying
//! collector client.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::delivery::CollectorClient;
use crate::pipeline::PipelineStats;

/// In-memory buffer of pending diagnostic/status strings.
#[derive(Debug, Default)]
pub struct DiagnosticsBuffer {
    messages: Mutex<Vec<String>>,
}

impl DiagnosticsBuffer {
    /// Queue a message for the next flush. Never blocks on I/O.
    pub fn push(&self, message: impl Into<String>) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.into());
        }
    }

    /// Take every pending message, leaving the buffer empty.
    pub fn drain(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(mut messages) => std::mem::take(&mut *messages),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Timer-driven drain of the diagnostics buffer.
pub(crate) struct DiagnosticsFlusher {
    buffer: Arc<DiagnosticsBuffer>,
    client: Arc<CollectorClient>,
    stats: Arc<PipelineStats>,
    period: Duration,
}

impl DiagnosticsFlusher {
    pub(crate) fn new(
        buffer: Arc<DiagnosticsBuffer>,
        client: Arc<CollectorClient>,
        stats: Arc<PipelineStats>,
        period: Duration,
    ) -> Self {
        Self {
            buffer,
            client,
            stats,
            period,
        }
    }

    /// Spawn the flush loop. Each cycle appends a pipeline status line, then
    /// drains the buffer; undeliverable messages are dropped with a local log
    /// line. The task runs until aborted at shutdown.
    pub(crate) fn run(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; the flush cadence starts one
            // full period in.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.buffer.push(self.stats.status_line());
                for message in self.buffer.drain() {
                    if let Err(e) = self.client.send_diagnostic(&message).await {
                        self.stats.diagnostics_dropped.fetch_add(1, Ordering::Relaxed);
                        debug!(error = %e, "diagnostic message dropped");
                    }
                }
            }
        })
    }
}
