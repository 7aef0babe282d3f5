//! Helm method: a values file for the `whatap-agent` chart.

use serde::Serialize;

use guide_core::{Configuration, ContainerRuntime, GeneratedFile, GuideResult, InstallMethod, Syntax};

use crate::platform::{AgentSecurityContext, PlatformOverrides};
use crate::render::to_yaml;
use crate::selector::LabelMap;
use crate::AGENT_IMAGE;

pub const VALUES_FILE: &str = "whatap-agent-values.yaml";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmValues {
    whatap: Credentials,
    image: Image,
    container_runtime: ContainerRuntime,
    runtime_socket_path: &'static str,
    master_agent: AgentValues,
    node_agent: AgentValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    gpu_monitoring: Option<Enabled>,
    platform: Platform,
}

#[derive(Debug, Serialize)]
struct Credentials {
    license: String,
    host: String,
    port: String,
}

#[derive(Debug, Serialize)]
struct Image {
    repository: &'static str,
    tag: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentValues {
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    security_context: Option<AgentSecurityContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pod_annotations: Option<LabelMap>,
}

#[derive(Debug, Serialize)]
struct Enabled {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct Platform {
    gke: bool,
    openshift: bool,
    istio: bool,
}

impl HelmValues {
    pub fn for_config(config: &Configuration) -> Self {
        let platform = PlatformOverrides::for_config(config);
        Self {
            whatap: Credentials {
                license: config.access_key.clone(),
                host: config.whatap_server.clone(),
                port: config.whatap_port.clone(),
            },
            image: Image {
                repository: AGENT_IMAGE,
                tag: platform.image_tag,
            },
            container_runtime: platform.runtime,
            runtime_socket_path: platform.runtime_socket_path,
            master_agent: AgentValues {
                enabled: true,
                security_context: None,
                pod_annotations: platform.pod_annotations.clone(),
            },
            node_agent: AgentValues {
                enabled: true,
                security_context: platform.security_context,
                pod_annotations: platform.pod_annotations,
            },
            gpu_monitoring: config.is_gpu.then_some(Enabled { enabled: true }),
            platform: Platform {
                gke: config.is_gke,
                openshift: config.is_open_shift,
                istio: config.is_istio,
            },
        }
    }
}

fn describe(config: &Configuration) -> String {
    let mut description = String::from("Values for the whatap/whatap-agent chart");
    let skipped: Vec<&str> = [("APM", config.use_apm), ("OpenMetrics", config.use_open_metrics)]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect();
    if !skipped.is_empty() {
        description.push_str(&format!(
            ". Not configured here: {}. Install with the operator method to enable them",
            skipped.join(" and ")
        ));
    }
    description
}

pub fn assemble(config: &Configuration) -> GuideResult<Vec<GeneratedFile>> {
    Ok(vec![GeneratedFile {
        name: VALUES_FILE.into(),
        method: InstallMethod::Helm,
        language: Syntax::Yaml,
        content: to_yaml(VALUES_FILE, &HelmValues::for_config(config))?,
        description: Some(describe(config)),
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(config: &Configuration) -> serde_yaml::Value {
        let files = assemble(config).unwrap();
        serde_yaml::from_str(&files[0].content).unwrap()
    }

    fn helm() -> Configuration {
        Configuration {
            install_method: InstallMethod::Helm,
            access_key: "key".into(),
            whatap_server: "15.165.146.117".into(),
            ..Configuration::default()
        }
    }

    #[test]
    fn values_carry_credentials_and_image() {
        let values = values(&helm());
        assert_eq!(values["whatap"]["license"].as_str(), Some("key"));
        assert_eq!(values["whatap"]["port"].as_str(), Some("6600"));
        assert_eq!(values["image"]["repository"].as_str(), Some("whatap/kube_mon"));
        assert_eq!(values["image"]["tag"].as_str(), Some("latest"));
        assert_eq!(values["platform"]["gke"].as_bool(), Some(false));
        assert!(values.get("gpuMonitoring").is_none());
    }

    #[test]
    fn apm_and_open_metrics_are_left_out() {
        let config = Configuration {
            use_apm: true,
            use_open_metrics: true,
            ..helm()
        };
        let files = assemble(&config).unwrap();
        assert!(!files[0].content.contains("sample-app"));
        assert!(!files[0].content.contains("sample-metrics"));
        assert!(files[0]
            .description
            .as_deref()
            .is_some_and(|d| d.contains("Not configured here: APM and OpenMetrics")));
    }

    #[test]
    fn gpu_and_platform_flags_are_rendered() {
        let config = Configuration {
            is_gpu: true,
            is_open_shift: true,
            is_istio: true,
            ..helm()
        };
        let values = values(&config);
        assert_eq!(values["gpuMonitoring"]["enabled"].as_bool(), Some(true));
        assert_eq!(values["nodeAgent"]["securityContext"]["privileged"].as_bool(), Some(true));
        assert!(values["masterAgent"].get("securityContext").is_none());
        assert_eq!(
            values["masterAgent"]["podAnnotations"]["sidecar.istio.io/inject"].as_str(),
            Some("false")
        );
        assert_eq!(values["platform"]["openshift"].as_bool(), Some(true));
    }
}
