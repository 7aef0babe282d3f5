//! APM and OpenMetrics targets.
//!
//! The wizard hands targets over as loose field bags (single key/value pairs
//! or ordered label lists, plus fields that only matter for one target type).
//! They are read through `Raw*` mirrors and converted into closed types, so a
//! static endpoint can never carry a selector and a pod monitor never carries
//! an address.

use serde::{Deserialize, Deserializer, Serialize};

use crate::choice::{Language, MonitorType, RelabelAction, Scheme, SelectionMethod};
use crate::collection::Keyed;

pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_SCRAPE_INTERVAL: &str = "30s";

/// One `key=value` label equality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelPair {
    pub key: String,
    pub value: String,
}

impl LabelPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Namespace choice of a target: the method plus both candidate inputs.
///
/// The wizard keeps both inputs while the user toggles the method; only the
/// one named by `method` is used when building selectors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamespaceSelection {
    pub method: SelectionMethod,
    /// Comma-separated namespace names.
    pub names: String,
    pub labels: Vec<LabelPair>,
}

impl NamespaceSelection {
    pub fn by_name(names: impl Into<String>) -> Self {
        Self {
            method: SelectionMethod::Name,
            names: names.into(),
            labels: Vec::new(),
        }
    }

    pub fn by_label(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            method: SelectionMethod::Label,
            names: String::new(),
            labels: vec![LabelPair::new(key, value)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawApmTarget", into = "RawApmTarget")]
pub struct ApmTarget {
    pub id: u32,
    pub name: String,
    pub language: Language,
    pub namespace: NamespaceSelection,
    pub pod_labels: Vec<LabelPair>,
}

impl ApmTarget {
    /// Row the wizard adds for a fresh id.
    pub fn numbered(id: u32) -> Self {
        let name = format!("app-{id}");
        Self {
            id,
            pod_labels: vec![LabelPair::new("app", name.clone())],
            name,
            language: Language::Java,
            namespace: NamespaceSelection::by_name("default"),
        }
    }

    pub fn sample() -> Self {
        Self {
            id: 1,
            name: "sample-app".into(),
            language: Language::Java,
            namespace: NamespaceSelection::by_name("default"),
            pod_labels: vec![LabelPair::new("app", "sample-app")],
        }
    }
}

impl Keyed for ApmTarget {
    fn id(&self) -> u32 {
        self.id
    }
}

/// Scrape discovery for pod and service monitors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorScope {
    pub namespace: NamespaceSelection,
    /// Labels matched against pods or services.
    pub selector_labels: Vec<LabelPair>,
    /// Port name or number exposing metrics.
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorKind {
    Pod(MonitorScope),
    Service(MonitorScope),
    Static { address: String },
}

impl MonitorKind {
    pub fn monitor_type(&self) -> MonitorType {
        match self {
            Self::Pod(_) => MonitorType::PodMonitor,
            Self::Service(_) => MonitorType::ServiceMonitor,
            Self::Static { .. } => MonitorType::StaticEndpoints,
        }
    }

    pub fn scope(&self) -> Option<&MonitorScope> {
        match self {
            Self::Pod(scope) | Self::Service(scope) => Some(scope),
            Self::Static { .. } => None,
        }
    }
}

/// Endpoint fields shared by every target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub interval: String,
    pub scheme: Scheme,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            path: DEFAULT_METRICS_PATH.into(),
            interval: DEFAULT_SCRAPE_INTERVAL.into(),
            scheme: Scheme::Http,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOpenMetricsTarget", into = "RawOpenMetricsTarget")]
pub struct OpenMetricsTarget {
    pub id: u32,
    pub target_name: String,
    pub kind: MonitorKind,
    pub endpoint: Endpoint,
    pub metric_relabel_configs: Vec<RelabelRule>,
}

impl OpenMetricsTarget {
    pub fn numbered(id: u32) -> Self {
        Self {
            id,
            target_name: format!("metrics-{id}"),
            kind: MonitorKind::Pod(MonitorScope {
                namespace: NamespaceSelection::by_name("default"),
                selector_labels: vec![LabelPair::new("app", format!("app-{id}"))],
                port: "metrics".into(),
            }),
            endpoint: Endpoint::default(),
            metric_relabel_configs: vec![RelabelRule::numbered(1)],
        }
    }

    pub fn sample() -> Self {
        Self {
            id: 1,
            target_name: "sample-metrics".into(),
            kind: MonitorKind::Pod(MonitorScope {
                namespace: NamespaceSelection::by_name("default"),
                selector_labels: vec![LabelPair::new("app", "sample-app")],
                port: "metrics".into(),
            }),
            endpoint: Endpoint::default(),
            metric_relabel_configs: vec![RelabelRule {
                regex: "apiserver_request_total".into(),
                ..RelabelRule::numbered(1)
            }],
        }
    }
}

impl Keyed for OpenMetricsTarget {
    fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelabelRule {
    pub id: u32,
    /// Comma-separated source label names, e.g. `__name__`.
    pub source_labels: String,
    pub regex: String,
    pub action: RelabelAction,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub replacement: String,
}

impl RelabelRule {
    pub fn numbered(id: u32) -> Self {
        Self {
            id,
            source_labels: "__name__".into(),
            regex: String::new(),
            action: RelabelAction::Keep,
            target_label: String::new(),
            replacement: String::new(),
        }
    }
}

impl Default for RelabelRule {
    fn default() -> Self {
        Self::numbered(1)
    }
}

impl Keyed for RelabelRule {
    fn id(&self) -> u32 {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Wire forms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawLabel {
    id: u32,
    key: String,
    value: String,
}

/// Accepts `6600` as well as `"6600"` for fields the wizard types as text.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
    })
}

/// Entries with both halves blank are placeholders for an unfilled row and
/// are ignored. Any remaining list entries win; otherwise the single key/value
/// pair is taken literally, unless both halves are empty.
fn merge_labels(list: Vec<RawLabel>, key: String, value: String) -> Vec<LabelPair> {
    let filled: Vec<LabelPair> = list
        .into_iter()
        .filter(|l| !(l.key.is_empty() && l.value.is_empty()))
        .map(|l| LabelPair {
            key: l.key,
            value: l.value,
        })
        .collect();

    if !filled.is_empty() {
        filled
    } else if key.is_empty() && value.is_empty() {
        Vec::new()
    } else {
        vec![LabelPair { key, value }]
    }
}

/// Inverse of [`merge_labels`]: one pair goes to the single fields.
fn split_labels(labels: Vec<LabelPair>) -> (Vec<RawLabel>, String, String) {
    match <[LabelPair; 1]>::try_from(labels) {
        Ok([single]) => (Vec::new(), single.key, single.value),
        Err(labels) => {
            let list = labels
                .into_iter()
                .zip(1..)
                .map(|(l, id)| RawLabel {
                    id,
                    key: l.key,
                    value: l.value,
                })
                .collect();
            (list, String::new(), String::new())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawApmTarget {
    id: u32,
    name: String,
    language: Language,
    namespace_selection_method: SelectionMethod,
    namespaces: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace_label_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace_label_value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    namespace_labels: Vec<RawLabel>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pod_label_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pod_label_value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pod_labels: Vec<RawLabel>,
}

/// Omitted fields fall back to an inert target: no pod labels, so the pod
/// selector matches nothing.
impl Default for RawApmTarget {
    fn default() -> Self {
        Self {
            id: 1,
            name: String::new(),
            language: Language::Java,
            namespace_selection_method: SelectionMethod::Name,
            namespaces: "default".into(),
            namespace_label_key: String::new(),
            namespace_label_value: String::new(),
            namespace_labels: Vec::new(),
            pod_label_key: String::new(),
            pod_label_value: String::new(),
            pod_labels: Vec::new(),
        }
    }
}

impl From<RawApmTarget> for ApmTarget {
    fn from(raw: RawApmTarget) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            language: raw.language,
            namespace: NamespaceSelection {
                method: raw.namespace_selection_method,
                names: raw.namespaces,
                labels: merge_labels(
                    raw.namespace_labels,
                    raw.namespace_label_key,
                    raw.namespace_label_value,
                ),
            },
            pod_labels: merge_labels(raw.pod_labels, raw.pod_label_key, raw.pod_label_value),
        }
    }
}

impl From<ApmTarget> for RawApmTarget {
    fn from(target: ApmTarget) -> Self {
        let (namespace_labels, namespace_label_key, namespace_label_value) =
            split_labels(target.namespace.labels);
        let (pod_labels, pod_label_key, pod_label_value) = split_labels(target.pod_labels);
        Self {
            id: target.id,
            name: target.name,
            language: target.language,
            namespace_selection_method: target.namespace.method,
            namespaces: target.namespace.names,
            namespace_label_key,
            namespace_label_value,
            namespace_labels,
            pod_label_key,
            pod_label_value,
            pod_labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawOpenMetricsTarget {
    id: u32,
    target_name: String,
    #[serde(rename = "type")]
    monitor_type: MonitorType,
    #[serde(skip_serializing_if = "is_unspecified")]
    namespace_selection_method: SelectionMethod,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespaces: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace_label_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace_label_value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    namespace_labels: Vec<RawLabel>,
    #[serde(skip_serializing_if = "String::is_empty")]
    selector_label_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    selector_label_value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    selector_labels: Vec<RawLabel>,
    #[serde(deserialize_with = "string_or_number", skip_serializing_if = "String::is_empty")]
    port: String,
    path: String,
    interval: String,
    scheme: Scheme,
    #[serde(skip_serializing_if = "String::is_empty")]
    address: String,
    metric_relabel_configs: Vec<RelabelRule>,
}

impl Default for RawOpenMetricsTarget {
    fn default() -> Self {
        Self {
            id: 1,
            target_name: String::new(),
            monitor_type: MonitorType::PodMonitor,
            namespace_selection_method: SelectionMethod::Name,
            namespaces: "default".into(),
            namespace_label_key: String::new(),
            namespace_label_value: String::new(),
            namespace_labels: Vec::new(),
            selector_label_key: String::new(),
            selector_label_value: String::new(),
            selector_labels: Vec::new(),
            port: String::new(),
            path: DEFAULT_METRICS_PATH.into(),
            interval: DEFAULT_SCRAPE_INTERVAL.into(),
            scheme: Scheme::Http,
            address: String::new(),
            metric_relabel_configs: Vec::new(),
        }
    }
}

fn is_unspecified(method: &SelectionMethod) -> bool {
    *method == SelectionMethod::Unspecified
}

fn or_default(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

impl From<RawOpenMetricsTarget> for OpenMetricsTarget {
    fn from(raw: RawOpenMetricsTarget) -> Self {
        let RawOpenMetricsTarget {
            id,
            target_name,
            monitor_type,
            namespace_selection_method,
            namespaces,
            namespace_label_key,
            namespace_label_value,
            namespace_labels,
            selector_label_key,
            selector_label_value,
            selector_labels,
            port,
            path,
            interval,
            scheme,
            address,
            metric_relabel_configs,
        } = raw;

        let scope = MonitorScope {
            namespace: NamespaceSelection {
                method: namespace_selection_method,
                names: namespaces,
                labels: merge_labels(namespace_labels, namespace_label_key, namespace_label_value),
            },
            selector_labels: merge_labels(selector_labels, selector_label_key, selector_label_value),
            port,
        };
        let kind = match monitor_type {
            MonitorType::PodMonitor => MonitorKind::Pod(scope),
            MonitorType::ServiceMonitor => MonitorKind::Service(scope),
            MonitorType::StaticEndpoints => MonitorKind::Static { address },
        };

        Self {
            id,
            target_name,
            kind,
            endpoint: Endpoint {
                path: or_default(path, DEFAULT_METRICS_PATH),
                interval: or_default(interval, DEFAULT_SCRAPE_INTERVAL),
                scheme,
            },
            metric_relabel_configs,
        }
    }
}

impl From<OpenMetricsTarget> for RawOpenMetricsTarget {
    fn from(target: OpenMetricsTarget) -> Self {
        let monitor_type = target.kind.monitor_type();
        let mut raw = Self {
            id: target.id,
            target_name: target.target_name,
            monitor_type,
            namespace_selection_method: SelectionMethod::Unspecified,
            namespaces: String::new(),
            path: target.endpoint.path,
            interval: target.endpoint.interval,
            scheme: target.endpoint.scheme,
            metric_relabel_configs: target.metric_relabel_configs,
            ..Self::default()
        };
        match target.kind {
            MonitorKind::Pod(scope) | MonitorKind::Service(scope) => {
                let (namespace_labels, key, value) = split_labels(scope.namespace.labels);
                let (selector_labels, selector_key, selector_value) =
                    split_labels(scope.selector_labels);
                raw.namespace_selection_method = scope.namespace.method;
                raw.namespaces = scope.namespace.names;
                raw.namespace_labels = namespace_labels;
                raw.namespace_label_key = key;
                raw.namespace_label_value = value;
                raw.selector_labels = selector_labels;
                raw.selector_label_key = selector_key;
                raw.selector_label_value = selector_value;
                raw.port = scope.port;
            }
            MonitorKind::Static { address } => raw.address = address,
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pair_fields_become_one_label() {
        let target: ApmTarget = serde_yaml::from_str(
            r#"
id: 3
name: checkout
language: python
namespaceSelectionMethod: label
namespaceLabelKey: team
namespaceLabelValue: payments
podLabelKey: app
podLabelValue: checkout
"#,
        )
        .unwrap();

        assert_eq!(target.language, Language::Python);
        assert_eq!(target.namespace.method, SelectionMethod::Label);
        assert_eq!(target.namespace.labels, vec![LabelPair::new("team", "payments")]);
        assert_eq!(target.pod_labels, vec![LabelPair::new("app", "checkout")]);
    }

    #[test]
    fn label_lists_win_over_single_pair() {
        let target: ApmTarget = serde_yaml::from_str(
            r#"
id: 1
name: web
podLabelKey: ignored
podLabelValue: ignored
podLabels:
  - { id: 1, key: app, value: web }
  - { id: 2, key: tier, value: frontend }
"#,
        )
        .unwrap();

        assert_eq!(
            target.pod_labels,
            vec![LabelPair::new("app", "web"), LabelPair::new("tier", "frontend")]
        );
    }

    #[test]
    fn blank_list_rows_defer_to_the_single_pair() {
        let target: ApmTarget = serde_json::from_str(
            r#"{
              "id": 1, "name": "sample-app", "language": "java",
              "namespaceSelectionMethod": "label", "namespaces": "default",
              "namespaceLabelKey": "team", "namespaceLabelValue": "pay",
              "namespaceLabels": [{"id": 1, "key": "", "value": ""}],
              "podLabelKey": "app", "podLabelValue": "sample-app",
              "podLabels": [{"id": 1, "key": "", "value": ""}]
            }"#,
        )
        .unwrap();

        assert_eq!(target.namespace.labels, vec![LabelPair::new("team", "pay")]);
        assert_eq!(target.pod_labels, vec![LabelPair::new("app", "sample-app")]);
    }

    #[test]
    fn filled_list_rows_still_win_over_blank_ones() {
        let target: OpenMetricsTarget = serde_json::from_str(
            r#"{
              "targetName": "api", "type": "ServiceMonitor",
              "selectorLabelKey": "ignored", "selectorLabelValue": "ignored",
              "selectorLabels": [{"id": 1, "key": "", "value": ""},
                                 {"id": 2, "key": "component", "value": "apiserver"}]
            }"#,
        )
        .unwrap();

        let scope = target.kind.scope().unwrap();
        assert_eq!(scope.selector_labels, vec![LabelPair::new("component", "apiserver")]);
    }

    #[test]
    fn missing_pod_labels_leave_the_selector_empty() {
        let target: ApmTarget =
            serde_json::from_str(r#"{"id": 7, "name": "billing", "namespaces": "prod"}"#).unwrap();

        assert_eq!(target.name, "billing");
        assert_eq!(target.namespace, NamespaceSelection::by_name("prod"));
        assert!(target.pod_labels.is_empty());
    }

    #[test]
    fn static_endpoint_drops_selector_fields() {
        let target: OpenMetricsTarget = serde_yaml::from_str(
            r#"
id: 2
targetName: node-exporter
type: StaticEndpoints
namespaces: default
selectorLabelKey: app
selectorLabelValue: node
port: metrics
address: 192.168.1.100:9100
"#,
        )
        .unwrap();

        assert_eq!(
            target.kind,
            MonitorKind::Static {
                address: "192.168.1.100:9100".into()
            }
        );
        assert_eq!(target.endpoint.path, "/metrics");
        assert!(target.kind.scope().is_none());
    }

    #[test]
    fn numeric_port_is_accepted() {
        let target: OpenMetricsTarget =
            serde_yaml::from_str("targetName: api\ntype: ServiceMonitor\nport: 8080\n").unwrap();
        let scope = target.kind.scope().unwrap();
        assert_eq!(scope.port, "8080");
        assert_eq!(target.kind.monitor_type(), MonitorType::ServiceMonitor);
    }

    #[test]
    fn empty_path_and_interval_take_defaults() {
        let target: OpenMetricsTarget =
            serde_yaml::from_str("targetName: api\npath: ''\ninterval: ''\n").unwrap();
        assert_eq!(target.endpoint, Endpoint::default());
    }

    #[test]
    fn targets_survive_a_wire_round_trip() {
        let mut target = OpenMetricsTarget::sample();
        if let MonitorKind::Pod(scope) = &mut target.kind {
            scope.selector_labels.push(LabelPair::new("tier", "backend"));
        }
        let yaml = serde_yaml::to_string(&target).unwrap();
        let back: OpenMetricsTarget = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, target);

        let apm = ApmTarget::numbered(4);
        let yaml = serde_yaml::to_string(&apm).unwrap();
        assert_eq!(serde_yaml::from_str::<ApmTarget>(&yaml).unwrap(), apm);
    }
}
