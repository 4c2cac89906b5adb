//! The capture gateway: reentrancy-guarded entry points invoked at each
//! interception call-site.
//!
//! Processing an event (rule resolution, stack capture, encoding, queueing)
//! is itself built from operations a hook might observe. The gate flag stops
//! that recursion at the door: a capture arriving on a thread that is already
//! inside event processing returns immediately. The flag is thread-local, so
//! concurrent captures on other threads proceed untouched.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use sentrywire_core::event::{Event, EventKind};
use sentrywire_core::rules::{Disposition, FilterRuleList, StackVerbosity};
use sentrywire_core::wire::encode_line;

use crate::callstack;
use crate::pipeline::PipelineStats;

thread_local! {
    static GATE: Cell<bool> = const { Cell::new(false) };
}

/// RAII guard: the gate reopens when this drops, no matter how processing
/// exits.
pub(crate) struct GateToken;

impl Drop for GateToken {
    fn drop(&mut self) {
        GATE.with(|gate| gate.set(false));
    }
}

/// Close this thread's gate. Returns `None` when it is already closed,
/// meaning the caller is a reentrant capture and must do nothing.
pub(crate) fn try_enter() -> Option<GateToken> {
    GATE.with(|gate| {
        if gate.get() {
            None
        } else {
            gate.set(true);
            Some(GateToken)
        }
    })
}

/// Cheap, cloneable handle through which interception points report observed
/// operations. One `capture_*` entry per operation kind.
#[derive(Clone)]
pub struct CaptureGateway {
    identity: String,
    rules: Arc<FilterRuleList>,
    tx: mpsc::Sender<String>,
    stats: Arc<PipelineStats>,
}

impl CaptureGateway {
    pub(crate) fn new(
        identity: String,
        rules: Arc<FilterRuleList>,
        tx: mpsc::Sender<String>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            identity,
            rules,
            tx,
            stats,
        }
    }

    pub fn file_read(&self, path: &str) {
        self.capture(EventKind::FileRead, path, "", "");
    }

    pub fn file_write(&self, path: &str) {
        self.capture(EventKind::FileWrite, path, "", "");
    }

    pub fn file_delete(&self, path: &str) {
        self.capture(EventKind::FileDelete, path, "", "");
    }

    pub fn socket_connect(&self, host: &str, port: u16) {
        self.capture(EventKind::SocketConnect, host, &port.to_string(), "");
    }

    pub fn socket_accept(&self, host: &str, port: u16) {
        self.capture(EventKind::SocketAccept, host, &port.to_string(), "");
    }

    pub fn socket_listen(&self, port: u16) {
        self.capture(EventKind::SocketListen, &port.to_string(), "", "");
    }

    pub fn socket_multicast(&self, group: &str, port: u16) {
        self.capture(EventKind::SocketMulticast, group, &port.to_string(), "");
    }

    pub fn permission_check(&self, name: &str, actions: &str) {
        self.capture(EventKind::Permission, name, actions, "");
    }

    pub fn classloader_create(&self, loader: &str) {
        self.capture(EventKind::ClassloaderCreate, loader, "", "");
    }

    pub fn process_exit(&self, status: i32) {
        self.capture(EventKind::ProcessExit, &status.to_string(), "", "");
    }

    pub fn package_access(&self, package: &str) {
        self.capture(EventKind::PackageAccess, package, "", "");
    }

    pub fn package_define(&self, package: &str) {
        self.capture(EventKind::PackageDefine, package, "", "");
    }

    pub fn property_access(&self, key: &str) {
        self.capture(EventKind::PropertyAccess, key, "", "");
    }

    pub fn print_job(&self, job: &str) {
        self.capture(EventKind::PrintJob, job, "", "");
    }

    pub fn factory_set(&self, factory: &str) {
        self.capture(EventKind::FactorySet, factory, "", "");
    }

    pub fn link_library(&self, library: &str) {
        self.capture(EventKind::LinkLibrary, library, "", "");
    }

    /// Common capture path. Nothing raised below here may reach the monitored
    /// process: rule predicates are third-party code, so processing runs
    /// under a panic boundary and failures are counted and logged locally.
    fn capture(&self, kind: EventKind, param1: &str, param2: &str, param3: &str) {
        let Some(_gate) = try_enter() else {
            return;
        };
        self.stats.captured.fetch_add(1, Ordering::Relaxed);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.process(kind, param1, param2, param3);
        }));
        if outcome.is_err() {
            self.stats.capture_errors.fetch_add(1, Ordering::Relaxed);
            debug!(kind = %kind, "capture processing panicked; event dropped");
        }
    }

    fn process(&self, kind: EventKind, param1: &str, param2: &str, param3: &str) {
        let mut event = Event::record(kind, &self.identity, param1, param2, param3);
        let decision = self.rules.decide(&event);

        if decision.disposition == Disposition::Deny {
            self.stats.denied.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if decision.verbosity != StackVerbosity::None {
            event.callstack = callstack::render(decision.verbosity);
        }

        match self.tx.try_send(encode_line(&event)) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                // Queue full or pipeline shut down; the capture path never
                // blocks, so the event is dropped and counted.
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(kind = %kind, "delivery queue unavailable, event dropped");
            }
        }
    }
}
