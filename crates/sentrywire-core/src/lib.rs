//! # sentrywire-core
//!
//! Core type system for Sentrywire -- a runtime security-telemetry agent.
//!
//! This crate defines the shared types used across the pipeline: the canonical
//! [`Event`](event::Event) record, the escaped wire codec, the filter/decision
//! engine that maps event types to allow/deny dispositions, and the agent
//! configuration surface. Everything here is synchronous and safe for
//! concurrent use from capture-path threads; the async delivery side lives in
//! `sentrywire-agent`.

pub mod config;
pub mod error;
pub mod event;
pub mod rules;
pub mod wire;

pub use error::{Result, SentryError};
pub use event::{Event, EventKind};
pub use rules::{Decision, Disposition, FilterRule, FilterRuleList, StackVerbosity};
