//! Operator method: one aggregated `WhatapAgent` custom resource plus the
//! credential secret it reads.
//!
//! Features that touch the same CR section are merged before rendering. GPU
//! scraping and OpenMetrics both live in `features.openAgent`, which is built
//! once from the union of the two flags; the struct has a single slot for it,
//! so the rendered document cannot repeat the key.

use serde::Serialize;
use std::collections::BTreeMap;

use guide_core::{
    ApmTarget, Configuration, ContainerRuntime, GeneratedFile, GuideResult, InstallMethod,
    K8sVersion, Language, MonitorKind, MonitorType, OpenMetricsTarget, Scheme, Syntax,
};

use crate::k8s;
use crate::platform::{AgentSecurityContext, PlatformOverrides};
use crate::relabel::{compile_relabel_rules, RelabelConfig};
use crate::render::{multi_document, to_yaml};
use crate::selector::{build_label_selector, build_namespace_selector, LabelMap, LabelSelector, SelectorSpec};
use crate::{AGENT_IMAGE, AGENT_NAMESPACE};

pub const CR_FILE: &str = "whatap-agent-cr.yaml";
pub const CREDENTIALS_FILE: &str = "whatap-credentials.yaml";

const CR_API_VERSION: &str = "monitoring.whatap.com/v2alpha1";
const DCGM_EXPORTER: &str = "dcgm-exporter";
const DCGM_EXPORTER_PORT: u16 = 9400;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatapAgent {
    api_version: &'static str,
    kind: &'static str,
    metadata: CrMetadata,
    spec: WhatapAgentSpec,
}

#[derive(Debug, Serialize)]
struct CrMetadata {
    name: &'static str,
}

#[derive(Debug, Serialize)]
struct WhatapAgentSpec {
    license: String,
    host: String,
    port: String,
    features: Features,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Features {
    k8s_agent: K8sAgentSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    apm: Option<ApmSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    open_agent: Option<OpenAgentSpec>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct K8sAgentSpec {
    namespace: &'static str,
    agent_image_name: &'static str,
    agent_image_version: &'static str,
    container_runtime: ContainerRuntime,
    master_agent: MasterAgentSpec,
    node_agent: NodeAgentSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    gpu_monitoring: Option<Toggle>,
}

#[derive(Debug, Serialize)]
struct Toggle {
    enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MasterAgentSpec {
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pod_annotations: Option<LabelMap>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeAgentSpec {
    enabled: bool,
    runtime_socket_path: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    security_context: Option<AgentSecurityContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pod_annotations: Option<LabelMap>,
}

#[derive(Debug, Serialize)]
struct ApmSpec {
    instrumentation: Instrumentation,
}

#[derive(Debug, Serialize)]
struct Instrumentation {
    enabled: bool,
    targets: Vec<InstrumentationTarget>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentationTarget {
    name: String,
    enabled: bool,
    language: Language,
    whatap_apm_versions: BTreeMap<&'static str, &'static str>,
    namespace_selector: SelectorSpec,
    pod_selector: LabelSelector,
    config: ApmConfig,
}

#[derive(Debug, Serialize)]
struct ApmConfig {
    mode: &'static str,
}

/// `features.openAgent`. Also embedded by the standalone open-agent config.
#[derive(Debug, Serialize)]
pub(crate) struct OpenAgentSpec {
    pub(crate) enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) gpu: Option<GpuScrape>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) targets: Option<Vec<OpenAgentTarget>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GpuScrape {
    enabled: bool,
    exporter: &'static str,
    port: u16,
    interval: &'static str,
}

impl GpuScrape {
    pub(crate) fn dcgm() -> Self {
        Self {
            enabled: true,
            exporter: DCGM_EXPORTER,
            port: DCGM_EXPORTER_PORT,
            interval: guide_core::target::DEFAULT_SCRAPE_INTERVAL,
        }
    }
}

/// One monitor entry. Pod/Service monitors fill the selector fields and
/// `endpoints`; static endpoints fill `address` and the flat endpoint fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpenAgentTarget {
    target_name: String,
    #[serde(rename = "type")]
    monitor_type: MonitorType,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace_selector: Option<SelectorSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<LabelSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoints: Option<Vec<MonitorEndpoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheme: Option<Scheme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric_relabel_configs: Option<Vec<RelabelConfig>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MonitorEndpoint {
    port: String,
    path: String,
    interval: String,
    scheme: Scheme,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric_relabel_configs: Option<Vec<RelabelConfig>>,
}

/// `None` for an empty rule list so the key is left out entirely.
fn relabel_block(target: &OpenMetricsTarget) -> Option<Vec<RelabelConfig>> {
    let compiled = compile_relabel_rules(&target.metric_relabel_configs);
    (!compiled.is_empty()).then_some(compiled)
}

impl From<&OpenMetricsTarget> for OpenAgentTarget {
    fn from(target: &OpenMetricsTarget) -> Self {
        let endpoint = &target.endpoint;
        match &target.kind {
            MonitorKind::Pod(scope) | MonitorKind::Service(scope) => Self {
                target_name: target.target_name.clone(),
                monitor_type: target.kind.monitor_type(),
                enabled: true,
                namespace_selector: Some(build_namespace_selector(&scope.namespace)),
                selector: Some(build_label_selector(&scope.selector_labels)),
                endpoints: Some(vec![MonitorEndpoint {
                    port: scope.port.clone(),
                    path: endpoint.path.clone(),
                    interval: endpoint.interval.clone(),
                    scheme: endpoint.scheme,
                    metric_relabel_configs: relabel_block(target),
                }]),
                address: None,
                path: None,
                interval: None,
                scheme: None,
                metric_relabel_configs: None,
            },
            MonitorKind::Static { address } => Self {
                target_name: target.target_name.clone(),
                monitor_type: MonitorType::StaticEndpoints,
                enabled: true,
                namespace_selector: None,
                selector: None,
                endpoints: None,
                address: Some(address.clone()),
                path: Some(endpoint.path.clone()),
                interval: Some(endpoint.interval.clone()),
                scheme: Some(endpoint.scheme),
                metric_relabel_configs: relabel_block(target),
            },
        }
    }
}

impl From<&ApmTarget> for InstrumentationTarget {
    fn from(target: &ApmTarget) -> Self {
        Self {
            name: target.name.clone(),
            enabled: true,
            language: target.language,
            whatap_apm_versions: BTreeMap::from([(target.language.as_str(), "latest")]),
            namespace_selector: build_namespace_selector(&target.namespace),
            pod_selector: build_label_selector(&target.pod_labels),
            config: ApmConfig { mode: "default" },
        }
    }
}

/// Merge GPU scraping and OpenMetrics targets into one open-agent section.
/// `None` when neither feature asks for the open agent.
pub(crate) fn open_agent_section(
    gpu: bool,
    open_metrics: bool,
    targets: &[OpenMetricsTarget],
) -> Option<OpenAgentSpec> {
    if !gpu && !open_metrics {
        return None;
    }
    Some(OpenAgentSpec {
        enabled: true,
        gpu: gpu.then(GpuScrape::dcgm),
        targets: open_metrics.then(|| targets.iter().map(OpenAgentTarget::from).collect()),
    })
}

pub fn build_custom_resource(config: &Configuration) -> WhatapAgent {
    let platform = PlatformOverrides::for_config(config);

    let apm = config.apm_active().then(|| ApmSpec {
        instrumentation: Instrumentation {
            enabled: true,
            targets: config.apm_targets.iter().map(InstrumentationTarget::from).collect(),
        },
    });

    WhatapAgent {
        api_version: CR_API_VERSION,
        kind: "WhatapAgent",
        metadata: CrMetadata { name: "whatap" },
        spec: WhatapAgentSpec {
            license: config.access_key.clone(),
            host: config.whatap_server.clone(),
            port: config.whatap_port.clone(),
            features: Features {
                k8s_agent: K8sAgentSpec {
                    namespace: AGENT_NAMESPACE,
                    agent_image_name: AGENT_IMAGE,
                    agent_image_version: platform.image_tag,
                    container_runtime: platform.runtime,
                    master_agent: MasterAgentSpec {
                        enabled: true,
                        pod_annotations: platform.pod_annotations.clone(),
                    },
                    node_agent: NodeAgentSpec {
                        enabled: true,
                        runtime_socket_path: platform.runtime_socket_path,
                        security_context: platform.security_context,
                        pod_annotations: platform.pod_annotations,
                    },
                    gpu_monitoring: config.is_gpu.then_some(Toggle { enabled: true }),
                },
                apm,
                open_agent: open_agent_section(
                    config.is_gpu,
                    config.open_metrics_active(),
                    &config.open_metrics_targets,
                ),
            },
        },
    }
}

fn describe(config: &Configuration) -> String {
    let mut sections = vec!["k8sAgent".to_string()];
    if config.apm_active() {
        sections.push(format!("apm ({} targets)", config.apm_targets.len()));
    }
    if config.is_gpu || config.open_metrics_active() {
        let mut parts = Vec::new();
        if config.is_gpu {
            parts.push("gpu".to_string());
        }
        if config.open_metrics_active() {
            parts.push(format!("{} targets", config.open_metrics_targets.len()));
        }
        sections.push(format!("openAgent ({})", parts.join(", ")));
    }

    let mut description = format!("WhatapAgent custom resource: {}", sections.join(", "));
    if config.k8s_version == K8sVersion::Legacy {
        description.push_str(
            ". The operator installs apiextensions.k8s.io/v1 CRDs and needs Kubernetes 1.16 or newer",
        );
    }
    description
}

pub fn assemble(config: &Configuration) -> GuideResult<Vec<GeneratedFile>> {
    let cr = to_yaml(CR_FILE, &build_custom_resource(config))?;
    let credentials = multi_document(CREDENTIALS_FILE, &[k8s::credentials_secret(config)?])?;

    Ok(vec![
        GeneratedFile {
            name: CR_FILE.into(),
            method: InstallMethod::Operator,
            language: Syntax::Yaml,
            content: cr,
            description: Some(describe(config)),
        },
        GeneratedFile {
            name: CREDENTIALS_FILE.into(),
            method: InstallMethod::Operator,
            language: Syntax::Yaml,
            content: credentials,
            description: Some(format!(
                "Secret holding the access key and server address, read by the operator in {AGENT_NAMESPACE}"
            )),
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use guide_core::{LabelPair, MonitorScope, NamespaceSelection, RelabelAction, RelabelRule};

    fn cr_value(config: &Configuration) -> serde_yaml::Value {
        let files = assemble(config).unwrap();
        serde_yaml::from_str(&files[0].content).unwrap()
    }

    fn base() -> Configuration {
        Configuration {
            access_key: "x43a42205jmf3".into(),
            whatap_server: "15.165.146.117".into(),
            ..Configuration::default()
        }
    }

    #[test]
    fn produces_cr_and_secret() {
        let files = assemble(&base()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, [CR_FILE, CREDENTIALS_FILE]);
        assert!(files.iter().all(|f| f.method == InstallMethod::Operator));

        let cr = cr_value(&base());
        assert_eq!(cr["kind"].as_str(), Some("WhatapAgent"));
        assert_eq!(cr["spec"]["license"].as_str(), Some("x43a42205jmf3"));
        assert_eq!(cr["spec"]["port"].as_str(), Some("6600"));
        let k8s_agent = &cr["spec"]["features"]["k8sAgent"];
        assert_eq!(k8s_agent["namespace"].as_str(), Some("whatap-monitoring"));
        assert_eq!(k8s_agent["masterAgent"]["enabled"].as_bool(), Some(true));
        assert_eq!(k8s_agent["nodeAgent"]["enabled"].as_bool(), Some(true));
    }

    #[test]
    fn no_open_agent_without_gpu_or_open_metrics() {
        let files = assemble(&base()).unwrap();
        assert!(!files[0].content.contains("openAgent"));
        let cr = cr_value(&base());
        assert!(cr["spec"]["features"].get("apm").is_none());
    }

    #[test]
    fn gpu_and_open_metrics_share_one_open_agent_section() {
        let config = Configuration {
            is_gpu: true,
            use_open_metrics: true,
            ..base()
        };
        let files = assemble(&config).unwrap();
        assert_eq!(files[0].content.matches("openAgent:").count(), 1);

        let cr = cr_value(&config);
        let open_agent = &cr["spec"]["features"]["openAgent"];
        assert_eq!(open_agent["enabled"].as_bool(), Some(true));
        assert_eq!(open_agent["gpu"]["exporter"].as_str(), Some("dcgm-exporter"));
        let targets = open_agent["targets"].as_sequence().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0]["targetName"].as_str(), Some("sample-metrics"));
        assert_eq!(
            cr["spec"]["features"]["k8sAgent"]["gpuMonitoring"]["enabled"].as_bool(),
            Some(true)
        );
    }

    #[test]
    fn gpu_alone_enables_open_agent_without_targets() {
        let config = Configuration {
            is_gpu: true,
            ..base()
        };
        let cr = cr_value(&config);
        let open_agent = &cr["spec"]["features"]["openAgent"];
        assert_eq!(open_agent["enabled"].as_bool(), Some(true));
        assert!(open_agent.get("targets").is_none());
    }

    #[test]
    fn static_endpoint_entry_has_address_and_no_selectors() {
        let mut target = OpenMetricsTarget::sample();
        target.kind = MonitorKind::Static {
            address: "192.168.1.100:9100".into(),
        };
        let config = Configuration {
            use_open_metrics: true,
            open_metrics_targets: vec![target],
            ..base()
        };

        let files = assemble(&config).unwrap();
        assert!(files[0].content.contains("address: 192.168.1.100:9100"));

        let cr = cr_value(&config);
        let entry = &cr["spec"]["features"]["openAgent"]["targets"][0];
        let map = entry.as_mapping().unwrap();
        assert_eq!(entry["type"].as_str(), Some("StaticEndpoints"));
        assert_eq!(entry["path"].as_str(), Some("/metrics"));
        for absent in ["selector", "namespaceSelector", "endpoints"] {
            assert!(!map.contains_key(absent), "{absent} should be omitted");
        }
        assert_eq!(entry["metricRelabelConfigs"][0]["action"].as_str(), Some("keep"));
    }

    #[test]
    fn service_monitor_entry_carries_selectors_and_endpoint() {
        let target = OpenMetricsTarget {
            id: 2,
            target_name: "kube-apiserver".into(),
            kind: MonitorKind::Service(MonitorScope {
                namespace: NamespaceSelection::by_label("kubernetes.io/metadata.name", "default"),
                selector_labels: vec![
                    LabelPair::new("component", "apiserver"),
                    LabelPair::new("provider", "kubernetes"),
                ],
                port: "https".into(),
            }),
            endpoint: guide_core::Endpoint {
                scheme: Scheme::Https,
                ..guide_core::Endpoint::default()
            },
            metric_relabel_configs: vec![RelabelRule {
                action: RelabelAction::Replace,
                source_labels: "method".into(),
                regex: "(.*)".into(),
                target_label: "http_method".into(),
                replacement: "$1".into(),
                id: 1,
            }],
        };
        let config = Configuration {
            use_open_metrics: true,
            open_metrics_targets: vec![target],
            ..base()
        };

        let cr = cr_value(&config);
        let entry = &cr["spec"]["features"]["openAgent"]["targets"][0];
        assert_eq!(entry["type"].as_str(), Some("ServiceMonitor"));
        assert_eq!(
            entry["namespaceSelector"]["matchLabels"]["kubernetes.io/metadata.name"].as_str(),
            Some("default")
        );
        assert_eq!(entry["selector"]["matchLabels"]["provider"].as_str(), Some("kubernetes"));
        let endpoint = &entry["endpoints"][0];
        assert_eq!(endpoint["port"].as_str(), Some("https"));
        assert_eq!(endpoint["scheme"].as_str(), Some("https"));
        assert_eq!(endpoint["metricRelabelConfigs"][0]["replacement"].as_str(), Some("$1"));
        assert!(entry.get("address").is_none());
    }

    #[test]
    fn empty_relabel_list_omits_the_key() {
        let mut target = OpenMetricsTarget::sample();
        target.metric_relabel_configs.clear();
        let config = Configuration {
            use_open_metrics: true,
            open_metrics_targets: vec![target],
            ..base()
        };
        let cr = cr_value(&config);
        let endpoint = &cr["spec"]["features"]["openAgent"]["targets"][0]["endpoints"][0];
        assert!(endpoint.get("metricRelabelConfigs").is_none());
    }

    #[test]
    fn apm_targets_fan_out_in_order() {
        let mut second = ApmTarget::numbered(2);
        second.language = Language::Python;
        let config = Configuration {
            use_apm: true,
            apm_targets: vec![ApmTarget::sample(), second],
            ..base()
        };
        let cr = cr_value(&config);
        let instrumentation = &cr["spec"]["features"]["apm"]["instrumentation"];
        assert_eq!(instrumentation["enabled"].as_bool(), Some(true));
        let targets = instrumentation["targets"].as_sequence().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0]["name"].as_str(), Some("sample-app"));
        assert_eq!(targets[0]["namespaceSelector"]["matchNames"][0].as_str(), Some("default"));
        assert_eq!(targets[0]["podSelector"]["matchLabels"]["app"].as_str(), Some("sample-app"));
        assert_eq!(targets[1]["language"].as_str(), Some("python"));
        assert_eq!(targets[1]["whatapApmVersions"]["python"].as_str(), Some("latest"));
    }

    #[test]
    fn platform_flags_land_in_separate_fields() {
        let config = Configuration {
            is_gke: true,
            is_open_shift: true,
            is_istio: true,
            container_runtime: ContainerRuntime::Docker,
            ..base()
        };
        let cr = cr_value(&config);
        let k8s_agent = &cr["spec"]["features"]["k8sAgent"];
        assert_eq!(k8s_agent["containerRuntime"].as_str(), Some("containerd"));
        let node = &k8s_agent["nodeAgent"];
        assert_eq!(
            node["runtimeSocketPath"].as_str(),
            Some("/run/containerd/containerd.sock")
        );
        assert_eq!(node["securityContext"]["privileged"].as_bool(), Some(true));
        assert_eq!(
            node["podAnnotations"]["sidecar.istio.io/inject"].as_str(),
            Some("false")
        );
        assert_eq!(
            k8s_agent["masterAgent"]["podAnnotations"]["sidecar.istio.io/inject"].as_str(),
            Some("false")
        );
    }

    #[test]
    fn legacy_cluster_is_noted_in_description() {
        let config = Configuration {
            k8s_version: K8sVersion::Legacy,
            ..base()
        };
        let files = assemble(&config).unwrap();
        assert!(files[0]
            .description
            .as_deref()
            .is_some_and(|d| d.contains("1.16 or newer")));
    }
}
