//! Filter rules and the decision engine.
//!
//! Every captured event is resolved against the configured rule set to decide
//! whether it is shipped at all and how much call-stack detail to attach.
//! Rules are loaded once at startup and immutable afterwards, so lookups need
//! no locking on the capture path.

pub mod base;
pub mod loader;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SentryError;
use crate::event::{Event, EventKind};

pub use base::BaseRule;
pub use loader::{load_rules, MAX_RULE_ORDINAL};
pub use registry::{RuleRegistry, RuleSpec};

/// What to do with a captured event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// Encode and ship the event.
    Allow,
    /// Drop the event before encoding.
    Deny,
}

impl FromStr for Disposition {
    type Err = SentryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOW" => Ok(Disposition::Allow),
            "DENY" => Ok(Disposition::Deny),
            other => Err(SentryError::Config(format!(
                "unknown disposition '{other}', expected ALLOW or DENY"
            ))),
        }
    }
}

/// How much call-origin detail to attach to a captured event.
///
/// A per-event-type policy knob, not a global one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StackVerbosity {
    /// No capture. Cheapest; the callstack field carries the disabled marker.
    None,
    /// Frame symbol names only.
    Limited,
    /// Resolved source-file origins.
    SourceLocation,
    /// Symbol, file, and line per frame.
    Full,
}

impl StackVerbosity {
    /// The name this verbosity carries in configuration.
    pub fn config_name(&self) -> &'static str {
        match self {
            StackVerbosity::None => "NONE",
            StackVerbosity::Limited => "LIMITED",
            StackVerbosity::SourceLocation => "SOURCE-LOCATION",
            StackVerbosity::Full => "FULL",
        }
    }
}

impl fmt::Display for StackVerbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl FromStr for StackVerbosity {
    type Err = SentryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(StackVerbosity::None),
            "LIMITED" => Ok(StackVerbosity::Limited),
            "SOURCE-LOCATION" => Ok(StackVerbosity::SourceLocation),
            "FULL" => Ok(StackVerbosity::Full),
            other => Err(SentryError::Config(format!(
                "unknown stacktrace verbosity '{other}'"
            ))),
        }
    }
}

/// A configured policy unit.
///
/// Implementations are constructed once at startup through the
/// [`RuleRegistry`] and owned collectively by a [`FilterRuleList`].
pub trait FilterRule: Send + Sync {
    /// The class identifier this rule was configured with, for diagnostics.
    fn name(&self) -> &str;

    /// Whether this rule is registered for the given event type.
    fn applies_to(&self, kind: EventKind) -> bool;

    /// Finer-grained match logic consulted once [`applies_to`](Self::applies_to)
    /// holds. The base implementation accepts everything.
    fn is_match(&self, _event: &Event) -> bool {
        true
    }

    /// Disposition returned when this rule matches.
    fn disposition(&self) -> Disposition;

    /// Stack-capture verbosity for events this rule governs.
    fn verbosity(&self) -> StackVerbosity;

    /// Configuration keys scoped to this rule, prefix stripped.
    fn properties(&self) -> &BTreeMap<String, String>;
}

/// Outcome of resolving an event against the rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub disposition: Disposition,
    pub verbosity: StackVerbosity,
    /// Class identifier of the matched rule; `None` for the fallback.
    pub rule: Option<String>,
}

impl Decision {
    /// Hard-coded fallback for event types with no matching rule: ship the
    /// event, skip the stack. Nothing is silently lost by a misconfiguration
    /// and the expensive capture happens only when asked for.
    pub fn fallback() -> Self {
        Self {
            disposition: Disposition::Allow,
            verbosity: StackVerbosity::None,
            rule: None,
        }
    }
}

/// The loaded, immutable rule set. Single point queried per event.
#[derive(Default)]
pub struct FilterRuleList {
    rules: Vec<Box<dyn FilterRule>>,
}

impl FilterRuleList {
    pub fn new(rules: Vec<Box<dyn FilterRule>>) -> Self {
        Self { rules }
    }

    /// An empty list; every event resolves to the fallback.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule registered for the event's type whose match predicate
    /// accepts it. Configuration load order is evaluation order; there is no
    /// priority field.
    pub fn resolve(&self, event: &Event) -> Option<&dyn FilterRule> {
        self.rules
            .iter()
            .find(|r| r.applies_to(event.kind) && r.is_match(event))
            .map(|r| r.as_ref())
    }

    /// Resolve and fold in the fallback for unmatched events.
    pub fn decide(&self, event: &Event) -> Decision {
        match self.resolve(event) {
            Some(rule) => Decision {
                disposition: rule.disposition(),
                verbosity: rule.verbosity(),
                rule: Some(rule.name().to_string()),
            },
            None => Decision::fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn base_rule(kinds: &[EventKind], disposition: Disposition, verbosity: StackVerbosity) -> Box<dyn FilterRule> {
        Box::new(BaseRule::new(
            "default",
            kinds.iter().copied().collect::<HashSet<_>>(),
            disposition,
            verbosity,
            BTreeMap::new(),
        ))
    }

    fn event_of(kind: EventKind) -> Event {
        Event::record(kind, "agent", "p1", "", "")
    }

    #[test]
    fn verbosity_names_round_trip() {
        for v in [
            StackVerbosity::None,
            StackVerbosity::Limited,
            StackVerbosity::SourceLocation,
            StackVerbosity::Full,
        ] {
            assert_eq!(v.config_name().parse::<StackVerbosity>().unwrap(), v);
        }
    }

    #[test]
    fn unconfigured_kind_gets_fallback() {
        let list = FilterRuleList::empty();
        let decision = list.decide(&event_of(EventKind::FileRead));
        assert_eq!(decision.disposition, Disposition::Allow);
        assert_eq!(decision.verbosity, StackVerbosity::None);
        assert!(decision.rule.is_none());
    }

    #[test]
    fn rule_governs_only_its_kinds() {
        let list = FilterRuleList::new(vec![base_rule(
            &[EventKind::SocketConnect],
            Disposition::Deny,
            StackVerbosity::Full,
        )]);

        let denied = list.decide(&event_of(EventKind::SocketConnect));
        assert_eq!(denied.disposition, Disposition::Deny);
        assert_eq!(denied.verbosity, StackVerbosity::Full);

        let untouched = list.decide(&event_of(EventKind::FileRead));
        assert_eq!(untouched.disposition, Disposition::Allow);
        assert_eq!(untouched.verbosity, StackVerbosity::None);
    }

    #[test]
    fn first_match_in_load_order_wins() {
        let list = FilterRuleList::new(vec![
            base_rule(&[EventKind::FileRead], Disposition::Deny, StackVerbosity::None),
            base_rule(&[EventKind::FileRead], Disposition::Allow, StackVerbosity::Full),
        ]);
        let decision = list.decide(&event_of(EventKind::FileRead));
        assert_eq!(decision.disposition, Disposition::Deny);
    }

    #[test]
    fn match_predicate_is_consulted() {
        struct PathRule {
            properties: BTreeMap<String, String>,
        }

        impl FilterRule for PathRule {
            fn name(&self) -> &str {
                "path"
            }
            fn applies_to(&self, kind: EventKind) -> bool {
                kind == EventKind::FileRead
            }
            fn is_match(&self, event: &Event) -> bool {
                event.param1.starts_with("/etc/")
            }
            fn disposition(&self) -> Disposition {
                Disposition::Deny
            }
            fn verbosity(&self) -> StackVerbosity {
                StackVerbosity::None
            }
            fn properties(&self) -> &BTreeMap<String, String> {
                &self.properties
            }
        }

        let list = FilterRuleList::new(vec![Box::new(PathRule {
            properties: BTreeMap::new(),
        })]);

        let etc = Event::record(EventKind::FileRead, "agent", "/etc/shadow", "", "");
        assert_eq!(list.decide(&etc).disposition, Disposition::Deny);

        // Same kind, predicate rejects: falls through to the fallback.
        let tmp = Event::record(EventKind::FileRead, "agent", "/tmp/scratch", "", "");
        let decision = list.decide(&tmp);
        assert_eq!(decision.disposition, Disposition::Allow);
        assert!(decision.rule.is_none());
    }
}
