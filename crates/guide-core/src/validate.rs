//! Non-fatal checks over a [`Configuration`].
//!
//! Nothing here rejects input: generation always proceeds, and these
//! warnings only tell the operator which parts of the output will be inert.

use std::collections::HashSet;
use std::fmt;

use crate::choice::{RelabelAction, SelectionMethod};
use crate::config::Configuration;
use crate::target::{MonitorKind, NamespaceSelection, OpenMetricsTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    MissingAccessKey,
    MissingServer,
    /// A feature flag is set but its target list is empty.
    NoTargets { feature: &'static str },
    /// A feature flag is set for a method that cannot deploy it.
    FeatureIgnored { feature: &'static str, method: String },
    DuplicateId { list: String, id: u32 },
    /// Label selection with an empty key selects nothing.
    EmptyLabelKey { target: String },
    /// Without relabel rules the open agent collects no metrics.
    NoRelabelRules { target: String },
    IncompleteReplace { target: String, rule: u32 },
    MissingAddress { target: String },
    InvalidInterval { target: String, interval: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAccessKey => write!(f, "access key is empty"),
            Self::MissingServer => write!(f, "WhaTap server address is empty"),
            Self::NoTargets { feature } => write!(f, "{feature} is enabled but has no targets"),
            Self::FeatureIgnored { feature, method } => write!(
                f,
                "{feature} is only applied by the operator method; ignored for '{method}'"
            ),
            Self::DuplicateId { list, id } => write!(f, "duplicate id {id} in {list}"),
            Self::EmptyLabelKey { target } => {
                write!(f, "target '{target}' selects by label with an empty key")
            }
            Self::NoRelabelRules { target } => write!(
                f,
                "target '{target}' has no metricRelabelConfigs; no metrics will be collected"
            ),
            Self::IncompleteReplace { target, rule } => write!(
                f,
                "target '{target}' rule #{rule} uses replace without a target label"
            ),
            Self::MissingAddress { target } => {
                write!(f, "static target '{target}' has no address")
            }
            Self::InvalidInterval { target, interval } => {
                write!(f, "target '{target}' has an unparsable interval '{interval}'")
            }
        }
    }
}

fn duplicate_ids(
    list: &str,
    ids: impl Iterator<Item = u32>,
    out: &mut Vec<ConfigWarning>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            out.push(ConfigWarning::DuplicateId {
                list: list.to_string(),
                id,
            });
        }
    }
}

fn empty_label_key(target: &str, namespace: &NamespaceSelection, out: &mut Vec<ConfigWarning>) {
    let empty = namespace.labels.is_empty() || namespace.labels.iter().any(|l| l.key.is_empty());
    if namespace.method == SelectionMethod::Label && empty {
        out.push(ConfigWarning::EmptyLabelKey {
            target: target.to_string(),
        });
    }
}

impl Configuration {
    /// Collect every warning, in a stable order.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut out = Vec::new();

        if self.access_key.trim().is_empty() {
            out.push(ConfigWarning::MissingAccessKey);
        }
        if self.whatap_server.trim().is_empty() {
            out.push(ConfigWarning::MissingServer);
        }

        for (feature, enabled, active, empty) in [
            ("APM", self.use_apm, self.apm_active(), self.apm_targets.is_empty()),
            (
                "OpenMetrics",
                self.use_open_metrics,
                self.open_metrics_active(),
                self.open_metrics_targets.is_empty(),
            ),
        ] {
            if enabled && !active {
                out.push(ConfigWarning::FeatureIgnored {
                    feature,
                    method: self.install_method.to_string(),
                });
            } else if active && empty {
                out.push(ConfigWarning::NoTargets { feature });
            }
        }

        if self.apm_active() {
            duplicate_ids("apmTargets", self.apm_targets.iter().map(|t| t.id), &mut out);
            for target in &self.apm_targets {
                empty_label_key(&target.name, &target.namespace, &mut out);
            }
        }

        if self.open_metrics_active() {
            duplicate_ids(
                "openMetricsTargets",
                self.open_metrics_targets.iter().map(|t| t.id),
                &mut out,
            );
            for target in &self.open_metrics_targets {
                check_open_metrics_target(target, &mut out);
            }
        }

        out
    }
}

fn check_open_metrics_target(target: &OpenMetricsTarget, out: &mut Vec<ConfigWarning>) {
    let name = target.target_name.as_str();
    match &target.kind {
        MonitorKind::Pod(scope) | MonitorKind::Service(scope) => {
            empty_label_key(name, &scope.namespace, out);
        }
        MonitorKind::Static { address } if address.trim().is_empty() => {
            out.push(ConfigWarning::MissingAddress {
                target: name.to_string(),
            });
        }
        MonitorKind::Static { .. } => {}
    }

    if humantime::parse_duration(&target.endpoint.interval).is_err() {
        out.push(ConfigWarning::InvalidInterval {
            target: name.to_string(),
            interval: target.endpoint.interval.clone(),
        });
    }

    if target.metric_relabel_configs.is_empty() {
        out.push(ConfigWarning::NoRelabelRules {
            target: name.to_string(),
        });
    }
    duplicate_ids(
        &format!("{name}.metricRelabelConfigs"),
        target.metric_relabel_configs.iter().map(|r| r.id),
        out,
    );
    for rule in &target.metric_relabel_configs {
        if rule.action == RelabelAction::Replace && rule.target_label.is_empty() {
            out.push(ConfigWarning::IncompleteReplace {
                target: name.to_string(),
                rule: rule.id,
            });
        }
    }
}
