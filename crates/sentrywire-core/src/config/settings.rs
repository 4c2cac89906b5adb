//! Agent settings and TOML configuration parsing.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level agent configuration, loaded from a TOML file.
///
/// The embedding layer resolves where the file lives; this type only parses
/// and defaults it. Rule definitions stay a flat string map (`[rules]` table
/// with dotted keys) so the ordinal loader sees the same surface regardless
/// of where the properties came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Collector endpoint for event and diagnostic submission. Only `http`
    /// and `https` schemes are accepted at delivery time.
    #[serde(default = "default_collector_url")]
    pub collector_url: String,

    /// Value of the fixed client identifier header on every request.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Capacity of the event delivery queue. Capture threads never block on
    /// a full queue; overflow events are dropped and counted.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Total delivery attempts per event before it is dropped.
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,

    /// Wait in milliseconds before attempt N; the last entry repeats for any
    /// further attempt. Must be non-decreasing.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,

    /// Interval between diagnostic/status buffer flushes, milliseconds.
    #[serde(default = "default_diagnostics_flush_ms")]
    pub diagnostics_flush_ms: u64,

    /// Flat ordinal-keyed rule properties (`"rule1.class"` etc.).
    #[serde(default)]
    pub rules: BTreeMap<String, String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            collector_url: default_collector_url(),
            client_id: default_client_id(),
            queue_capacity: default_queue_capacity(),
            retry_ceiling: default_retry_ceiling(),
            backoff_ms: default_backoff_ms(),
            diagnostics_flush_ms: default_diagnostics_flush_ms(),
            rules: BTreeMap::new(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: AgentConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

fn default_collector_url() -> String {
    "http://127.0.0.1:8041/events".to_string()
}

fn default_client_id() -> String {
    "sentrywire-agent/0.1".to_string()
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_retry_ceiling() -> u32 {
    5
}

fn default_backoff_ms() -> Vec<u64> {
    vec![0, 500, 4000, 13500, 32000]
}

fn default_diagnostics_flush_ms() -> u64 {
    2000
}
