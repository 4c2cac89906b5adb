//! Rule-class registry.
//!
//! Configuration names a rule implementation by an opaque class identifier;
//! the registry maps that identifier to a factory producing the rule value.
//! Unknown identifiers fail startup.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{Result, SentryError};
use crate::event::EventKind;
use crate::rules::base::BaseRule;
use crate::rules::{Disposition, FilterRule, StackVerbosity};

/// Everything a factory gets to construct one rule: the parsed quadruple plus
/// the rule's private property bag.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    /// Ordinal position in configuration; load order is evaluation order.
    pub ordinal: usize,
    pub kinds: HashSet<EventKind>,
    pub disposition: Disposition,
    pub verbosity: StackVerbosity,
    /// Keys sharing this rule's `ruleN.` prefix, prefix stripped.
    pub properties: BTreeMap<String, String>,
}

type RuleFactory = Box<dyn Fn(&RuleSpec) -> Result<Box<dyn FilterRule>> + Send + Sync>;

/// Maps configured class identifiers to rule constructors.
pub struct RuleRegistry {
    factories: HashMap<String, RuleFactory>,
}

impl RuleRegistry {
    /// A registry with only the built-in `"default"` class.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("default", |spec| {
            Ok(Box::new(BaseRule::new(
                "default",
                spec.kinds.clone(),
                spec.disposition,
                spec.verbosity,
                spec.properties.clone(),
            )))
        });
        registry
    }

    /// Register a rule class. Replaces any previous factory for the same id.
    pub fn register<F>(&mut self, class: &str, factory: F)
    where
        F: Fn(&RuleSpec) -> Result<Box<dyn FilterRule>> + Send + Sync + 'static,
    {
        self.factories.insert(class.to_string(), Box::new(factory));
    }

    /// Construct a rule of the given class.
    pub fn build(&self, class: &str, spec: &RuleSpec) -> Result<Box<dyn FilterRule>> {
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| SentryError::UnknownRuleClass(class.to_string()))?;
        factory(spec)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RuleSpec {
        RuleSpec {
            ordinal: 1,
            kinds: [EventKind::FileRead].into_iter().collect(),
            disposition: Disposition::Allow,
            verbosity: StackVerbosity::None,
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn builtin_default_class_builds() {
        let registry = RuleRegistry::with_builtins();
        let rule = registry.build("default", &spec()).unwrap();
        assert!(rule.applies_to(EventKind::FileRead));
        assert!(!rule.applies_to(EventKind::ProcessExit));
    }

    #[test]
    fn unknown_class_is_rejected() {
        let registry = RuleRegistry::with_builtins();
        let err = registry
            .build("com.example.Missing", &spec())
            .err()
            .expect("must fail");
        assert!(matches!(err, SentryError::UnknownRuleClass(_)));
    }

    #[test]
    fn registered_class_replaces_and_builds() {
        let mut registry = RuleRegistry::with_builtins();
        registry.register("strict", |spec| {
            Ok(Box::new(BaseRule::new(
                "strict",
                spec.kinds.clone(),
                Disposition::Deny,
                spec.verbosity,
                spec.properties.clone(),
            )))
        });
        let rule = registry.build("strict", &spec()).unwrap();
        assert_eq!(rule.disposition(), Disposition::Deny);
        assert_eq!(rule.name(), "strict");
    }
}
