//! The pipeline context: one explicitly constructed object wiring gateway,
//! rules, queue, delivery worker, and diagnostics flusher together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use sentrywire_core::config::AgentConfig;
use sentrywire_core::rules::{load_rules, FilterRuleList, RuleRegistry};
use sentrywire_core::Result;

use crate::delivery::{CollectorClient, DeliveryWorker};
use crate::diagnostics::{DiagnosticsBuffer, DiagnosticsFlusher};
use crate::gateway::CaptureGateway;

/// How long shutdown waits for the delivery worker to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Monotonic counters shared across the pipeline. Cheap enough to bump on
/// the capture path.
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Captures that passed the reentrancy gate.
    pub captured: AtomicU64,
    /// Events dropped by a DENY disposition.
    pub denied: AtomicU64,
    /// Events handed to the delivery queue.
    pub enqueued: AtomicU64,
    /// Events dropped because the queue was full or closed.
    pub dropped: AtomicU64,
    /// Events acknowledged by the collector.
    pub delivered: AtomicU64,
    /// Events dropped after exhausting delivery retries.
    pub failed: AtomicU64,
    /// Captures abandoned because processing panicked.
    pub capture_errors: AtomicU64,
    /// Diagnostic messages dropped after exhausting delivery retries.
    pub diagnostics_dropped: AtomicU64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            captured: self.captured.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            capture_errors: self.capture_errors.load(Ordering::Relaxed),
            diagnostics_dropped: self.diagnostics_dropped.load(Ordering::Relaxed),
        }
    }

    /// One-line status summary shipped with each diagnostics flush.
    pub fn status_line(&self) -> String {
        let s = self.snapshot();
        format!(
            "status captured={} denied={} enqueued={} dropped={} delivered={} failed={}",
            s.captured, s.denied, s.enqueued, s.dropped, s.delivered, s.failed
        )
    }
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub captured: u64,
    pub denied: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub failed: u64,
    pub capture_errors: u64,
    pub diagnostics_dropped: u64,
}

/// A running telemetry pipeline.
///
/// Construct one per monitored process at startup, hand [`CaptureGateway`]
/// clones to the interception layer, and keep the pipeline alive for the
/// process lifetime. Must be started from within a tokio runtime; the
/// delivery worker and diagnostics flusher are spawned onto it.
pub struct Pipeline {
    identity: String,
    rules: Arc<FilterRuleList>,
    tx: mpsc::Sender<String>,
    stats: Arc<PipelineStats>,
    diagnostics: Arc<DiagnosticsBuffer>,
    worker: tokio::task::JoinHandle<()>,
    flusher: tokio::task::JoinHandle<()>,
}

impl Pipeline {
    /// Load rules, spawn the background tasks, and return the running
    /// pipeline.
    ///
    /// Configuration problems are fatal here -- the pipeline refuses to run
    /// with a partially loaded rule set. The embedding layer decides whether
    /// that means "no telemetry" or a hard stop; it must not crash the
    /// monitored process on our behalf.
    pub fn start(config: AgentConfig, registry: &RuleRegistry) -> Result<Self> {
        let rules = Arc::new(load_rules(&config.rules, registry)?);
        let identity = Uuid::new_v4().to_string();
        let stats = Arc::new(PipelineStats::default());
        let diagnostics = Arc::new(DiagnosticsBuffer::default());
        let client = Arc::new(CollectorClient::new(&config));

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let worker = DeliveryWorker::new(Arc::clone(&client), Arc::clone(&stats)).run(rx);
        let flusher = DiagnosticsFlusher::new(
            Arc::clone(&diagnostics),
            client,
            Arc::clone(&stats),
            Duration::from_millis(config.diagnostics_flush_ms.max(1)),
        )
        .run();

        info!(
            identity = %identity,
            rules = rules.len(),
            collector = %config.collector_url,
            "telemetry pipeline started"
        );

        Ok(Self {
            identity,
            rules,
            tx,
            stats,
            diagnostics,
            worker,
            flusher,
        })
    }

    /// Opaque identifier of this agent instance, stamped into every event.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// A new gateway handle for the interception layer.
    pub fn gateway(&self) -> CaptureGateway {
        CaptureGateway::new(
            self.identity.clone(),
            Arc::clone(&self.rules),
            self.tx.clone(),
            Arc::clone(&self.stats),
        )
    }

    /// The diagnostics buffer; embedders may push their own status strings.
    pub fn diagnostics(&self) -> Arc<DiagnosticsBuffer> {
        Arc::clone(&self.diagnostics)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Best-effort shutdown: stop the diagnostics loop, close the queue, and
    /// give the delivery worker a short grace period to drain. In-flight
    /// deliveries past the grace period are abandoned.
    pub async fn shutdown(self) {
        self.flusher.abort();
        drop(self.tx);
        if tokio::time::timeout(SHUTDOWN_GRACE, self.worker).await.is_err() {
            info!("shutdown grace period elapsed with deliveries in flight");
        }
    }
}
