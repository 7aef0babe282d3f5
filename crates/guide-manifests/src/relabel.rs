//! Metric relabel rules.

use serde::Serialize;

use guide_core::{RelabelAction, RelabelRule};

use crate::selector::parse_names;

/// One `metricRelabelConfigs` entry.
///
/// `target_label` and `replacement` are present exactly when the action is
/// `replace`, possibly as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelabelConfig {
    pub source_labels: Vec<String>,
    pub regex: String,
    pub action: RelabelAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl From<&RelabelRule> for RelabelConfig {
    fn from(rule: &RelabelRule) -> Self {
        let replace = rule.action == RelabelAction::Replace;
        Self {
            source_labels: parse_names(&rule.source_labels),
            regex: rule.regex.clone(),
            action: rule.action,
            target_label: replace.then(|| rule.target_label.clone()),
            replacement: replace.then(|| rule.replacement.clone()),
        }
    }
}

/// Compile rules one-to-one, in the given order. Relabeling is order
/// sensitive, so nothing is sorted or deduplicated.
pub fn compile_relabel_rules(rules: &[RelabelRule]) -> Vec<RelabelConfig> {
    rules.iter().map(RelabelConfig::from).collect()
}
