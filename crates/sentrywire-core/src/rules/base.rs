//! The built-in filter rule implementation.

use std::collections::{BTreeMap, HashSet};

use crate::event::EventKind;
use crate::rules::{Disposition, FilterRule, StackVerbosity};

/// The `"default"` rule class: applies its configured disposition to every
/// event of its registered types, with no finer-grained match logic.
pub struct BaseRule {
    name: String,
    kinds: HashSet<EventKind>,
    disposition: Disposition,
    verbosity: StackVerbosity,
    properties: BTreeMap<String, String>,
}

impl BaseRule {
    pub fn new(
        name: &str,
        kinds: HashSet<EventKind>,
        disposition: Disposition,
        verbosity: StackVerbosity,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kinds,
            disposition,
            verbosity,
            properties,
        }
    }
}

impl FilterRule for BaseRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies_to(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    fn disposition(&self) -> Disposition {
        self.disposition
    }

    fn verbosity(&self) -> StackVerbosity {
        self.verbosity
    }

    fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}
