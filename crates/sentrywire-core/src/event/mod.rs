//! Event types for Sentrywire.
//!
//! Events are the fundamental data unit flowing through the pipeline. Each one
//! records a single sensitive operation observed in the monitored process,
//! normalized into a fixed ten-field record that the wire codec encodes
//! positionally.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::SentryError;

/// Placeholder for fields that are assigned server-side (`pk`, `state`).
pub const PLACEHOLDER: &str = "-1";

/// Literal marker written to the callstack field when stack capture is off.
pub const CALLSTACK_DISABLED: &str = "DISABLED";

/// Classification of an observed operation.
///
/// The set is fixed: configuration referring to any other name is rejected at
/// startup, and the wire format carries exactly these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// File opened for reading.
    FileRead,
    /// File opened for writing.
    FileWrite,
    /// File deletion.
    FileDelete,
    /// Outbound network connection.
    SocketConnect,
    /// Inbound connection accepted.
    SocketAccept,
    /// Listening socket opened.
    SocketListen,
    /// Multicast group joined.
    SocketMulticast,
    /// Runtime permission check.
    Permission,
    /// Code loader instantiated.
    ClassloaderCreate,
    /// Monitored process exiting.
    ProcessExit,
    /// Restricted package accessed.
    PackageAccess,
    /// Package defined in a restricted namespace.
    PackageDefine,
    /// System property read or written.
    PropertyAccess,
    /// Print job submitted.
    PrintJob,
    /// Runtime factory replaced.
    FactorySet,
    /// Native library linked.
    LinkLibrary,
}

impl EventKind {
    /// All kinds, in wire-name order. Used by configuration validation.
    pub const ALL: [EventKind; 16] = [
        EventKind::FileRead,
        EventKind::FileWrite,
        EventKind::FileDelete,
        EventKind::SocketConnect,
        EventKind::SocketAccept,
        EventKind::SocketListen,
        EventKind::SocketMulticast,
        EventKind::Permission,
        EventKind::ClassloaderCreate,
        EventKind::ProcessExit,
        EventKind::PackageAccess,
        EventKind::PackageDefine,
        EventKind::PropertyAccess,
        EventKind::PrintJob,
        EventKind::FactorySet,
        EventKind::LinkLibrary,
    ];

    /// The name this kind carries in wire lines and configuration.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventKind::FileRead => "FILE_READ",
            EventKind::FileWrite => "FILE_WRITE",
            EventKind::FileDelete => "FILE_DELETE",
            EventKind::SocketConnect => "SOCKET_CONNECT",
            EventKind::SocketAccept => "SOCKET_ACCEPT",
            EventKind::SocketListen => "SOCKET_LISTEN",
            EventKind::SocketMulticast => "SOCKET_MULTICAST",
            EventKind::Permission => "PERMISSION",
            EventKind::ClassloaderCreate => "CLASSLOADER_CREATE",
            EventKind::ProcessExit => "PROCESS_EXIT",
            EventKind::PackageAccess => "PACKAGE_ACCESS",
            EventKind::PackageDefine => "PACKAGE_DEFINE",
            EventKind::PropertyAccess => "PROPERTY_ACCESS",
            EventKind::PrintJob => "PRINT_JOB",
            EventKind::FactorySet => "FACTORY_SET",
            EventKind::LinkLibrary => "LINK_LIBRARY",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for EventKind {
    type Err = SentryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .find(|k| k.wire_name() == s)
            .copied()
            .ok_or_else(|| SentryError::UnknownEventType(s.to_string()))
    }
}

/// The canonical ten-field telemetry record.
///
/// Field order is fixed and positional; the codec never reorders. An event is
/// built once at capture time and treated as immutable after encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Server-assigned primary key; always `"-1"` on the agent side.
    pub pk: String,
    /// Server-assigned state; always `"-1"` on the agent side.
    pub state: String,
    /// Capture time, epoch milliseconds.
    pub timestamp: i64,
    /// Capturing thread, `"{name}-{id}"`.
    pub thread_stamp: String,
    /// Classified operation kind.
    pub kind: EventKind,
    /// Opaque identifier of the agent instance that observed the event.
    pub identity: String,
    /// Rendered call stack, or [`CALLSTACK_DISABLED`].
    pub callstack: String,
    /// Operation payload (file path, host, permission name, ...).
    pub param1: String,
    /// Second payload field (port, permission actions, ...).
    pub param2: String,
    /// Third payload field; rarely used.
    pub param3: String,
}

impl Event {
    /// Build a record for an operation observed right now on this thread.
    ///
    /// `pk` and `state` get their placeholders and the callstack starts
    /// disabled; the gateway overwrites it if the resolved rule asks for one.
    pub fn record(kind: EventKind, identity: &str, param1: &str, param2: &str, param3: &str) -> Self {
        Self {
            pk: PLACEHOLDER.to_string(),
            state: PLACEHOLDER.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            thread_stamp: thread_stamp(),
            kind,
            identity: identity.to_string(),
            callstack: CALLSTACK_DISABLED.to_string(),
            param1: param1.to_string(),
            param2: param2.to_string(),
            param3: param3.to_string(),
        }
    }
}

/// Stamp of the current thread: its name and numeric id, e.g. `"main-1"`.
pub fn thread_stamp() -> String {
    let current = std::thread::current();
    let name = current.name().unwrap_or("unnamed");
    // ThreadId has no stable numeric accessor; its Debug form is "ThreadId(N)".
    let id = format!("{:?}", current.id());
    let digits: String = id.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("{name}-{digits}")
}
