//! Caller-supplied custom rules
//!
//! A rule is a synchronous predicate over a legacy transaction. `Ok(true)`
//! passes, `Ok(false)` is a violation and `Err(reason)` means the rule could
//! not be evaluated; the orchestrator reports both as distinct warnings.

use crate::models::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A user-defined validation rule
pub trait CustomRule: Send + Sync {
    /// Name reported in warnings
    fn name(&self) -> &str;

    /// Disabled rules are skipped
    fn enabled(&self) -> bool {
        true
    }

    /// Evaluate the rule
    fn validate(&self, tx: &Transaction) -> Result<bool, String>;
}

/// Rule backed by a closure
pub struct FnRule<F> {
    name: String,
    enabled: bool,
    predicate: F,
}

impl<F> FnRule<F>
where
    F: Fn(&Transaction) -> Result<bool, String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            predicate,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl<F> CustomRule for FnRule<F>
where
    F: Fn(&Transaction) -> Result<bool, String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, tx: &Transaction) -> Result<bool, String> {
        (self.predicate)(tx)
    }
}

/// Shared, cloneable list of rules
#[derive(Clone, Default)]
pub struct CustomRules(Vec<Arc<dyn CustomRule>>);

impl CustomRules {
    pub fn new(rules: Vec<Arc<dyn CustomRule>>) -> Self {
        Self(rules)
    }

    pub fn push(&mut self, rule: Arc<dyn CustomRule>) {
        self.0.push(rule);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn CustomRule>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of all rules, enabled or not
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|r| r.name().to_string()).collect()
    }
}

impl std::fmt::Debug for CustomRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Declarative rules that can be loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    /// Reject transactions with more instructions than `limit`
    MaxInstructions { name: String, limit: usize },
    /// Reject transactions invoking any listed program
    DeniedPrograms { name: String, programs: Vec<String> },
    /// Reject transactions touching any listed asset
    DeniedAssets { name: String, assets: Vec<String> },
}

impl RuleSpec {
    /// Build the runtime rule
    pub fn build(&self) -> Arc<dyn CustomRule> {
        match self.clone() {
            RuleSpec::MaxInstructions { name, limit } => Arc::new(FnRule::new(name, move |tx: &Transaction| {
                Ok(tx.instructions().len() <= limit)
            })),
            RuleSpec::DeniedPrograms { name, programs } => {
                let denied: HashSet<String> = programs.into_iter().collect();
                Arc::new(FnRule::new(name, move |tx: &Transaction| {
                    Ok(!tx
                        .instructions()
                        .iter()
                        .any(|ix| denied.contains(&ix.program_id)))
                }))
            }
            RuleSpec::DeniedAssets { name, assets } => {
                let denied: HashSet<String> = assets.into_iter().collect();
                Arc::new(FnRule::new(name, move |tx: &Transaction| {
                    Ok(!tx.asset_addresses().iter().any(|a| denied.contains(a)))
                }))
            }
        }
    }
}

/// Build runtime rules from their declarative form
pub fn build_rules(specs: &[RuleSpec]) -> CustomRules {
    CustomRules::new(specs.iter().map(RuleSpec::build).collect())
}
