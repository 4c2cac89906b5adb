//! Ordinal-keyed rule loading.
//!
//! Rules arrive as flat string properties: `ruleN.class`, `ruleN.events`,
//! `ruleN.stacktrace`, `ruleN.default`, scanned for N = 1..=500. Gaps in the
//! ordinals are tolerated; a present-but-broken definition fails the whole
//! load, so the pipeline never runs with a partial rule set.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::error::{Result, SentryError};
use crate::event::EventKind;
use crate::rules::registry::{RuleRegistry, RuleSpec};
use crate::rules::FilterRuleList;

/// Highest ordinal scanned for rule definitions.
pub const MAX_RULE_ORDINAL: usize = 500;

/// Load the filter rule list from a flat property map.
pub fn load_rules(
    properties: &BTreeMap<String, String>,
    registry: &RuleRegistry,
) -> Result<FilterRuleList> {
    let mut rules = Vec::new();

    for ordinal in 1..=MAX_RULE_ORDINAL {
        let prefix = format!("rule{ordinal}.");
        let class = properties.get(&format!("{prefix}class"));
        let events = properties.get(&format!("{prefix}events"));
        let stacktrace = properties.get(&format!("{prefix}stacktrace"));
        let default = properties.get(&format!("{prefix}default"));

        let present = [class, events, stacktrace, default]
            .iter()
            .filter(|v| v.is_some())
            .count();
        if present == 0 {
            // Absent ordinal: skip, keep scanning.
            continue;
        }
        if present < 4 {
            return Err(SentryError::Config(format!(
                "rule{ordinal} is incomplete: class, events, stacktrace, and default are all required"
            )));
        }

        let (class, events, stacktrace, default) = (
            class.unwrap(),
            events.unwrap(),
            stacktrace.unwrap(),
            default.unwrap(),
        );

        let kinds = parse_event_list(ordinal, events)?;
        let verbosity = stacktrace.parse().map_err(|e| annotate(ordinal, e))?;
        let disposition = default.parse().map_err(|e| annotate(ordinal, e))?;

        // Every key under this rule's prefix goes into its private bag,
        // prefix stripped.
        let bag: BTreeMap<String, String> = properties
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(&prefix)
                    .map(|rest| (rest.to_string(), v.clone()))
            })
            .collect();

        let spec = RuleSpec {
            ordinal,
            kinds,
            disposition,
            verbosity,
            properties: bag,
        };
        let rule = registry
            .build(class, &spec)
            .map_err(|e| annotate(ordinal, e))?;
        debug!(ordinal, class = %class, events = %events, "loaded filter rule");
        rules.push(rule);
    }

    Ok(FilterRuleList::new(rules))
}

fn parse_event_list(ordinal: usize, events: &str) -> Result<HashSet<EventKind>> {
    let mut kinds = HashSet::new();
    for name in events.split(',') {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        kinds.insert(name.parse().map_err(|e| annotate(ordinal, e))?);
    }
    if kinds.is_empty() {
        return Err(SentryError::Config(format!(
            "rule{ordinal}.events names no event types"
        )));
    }
    Ok(kinds)
}

fn annotate(ordinal: usize, err: SentryError) -> SentryError {
    SentryError::Config(format!("rule{ordinal}: {err}"))
}
