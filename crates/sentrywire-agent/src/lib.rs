//! # sentrywire-agent
//!
//! The in-process half of Sentrywire: the reentrancy-guarded capture gateway
//! invoked at interception points, the background delivery path that ships
//! encoded events to the collector, and the diagnostics flush loop.
//!
//! Capture threads never perform I/O -- they resolve the event against the
//! configured rules, encode it, and enqueue. A stalled collector can cost
//! events (the queue is bounded) but can never stall the monitored
//! application's own threads.
//!
//! The pipeline is an explicit context object; nothing here is a process-wide
//! singleton, so multiple independent pipelines can coexist (and be tested in
//! isolation).

pub mod callstack;
pub mod delivery;
pub mod diagnostics;
pub mod gateway;
pub mod pipeline;

pub use delivery::{CollectorClient, DeliveryError};
pub use diagnostics::DiagnosticsBuffer;
pub use gateway::CaptureGateway;
pub use pipeline::{Pipeline, StatsSnapshot};
