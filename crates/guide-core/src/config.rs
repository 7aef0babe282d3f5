use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::choice::{ContainerRuntime, ImageVersion, InstallMethod, K8sVersion};
use crate::error::{GuideError, GuideResult};
use crate::target::{string_or_number, ApmTarget, OpenMetricsTarget};

pub const DEFAULT_WHATAP_PORT: &str = "6600";

/// Everything the wizard collects. Passed whole to every generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Project access key, copied verbatim into credentials.
    pub access_key: String,
    pub whatap_server: String,
    #[serde(deserialize_with = "string_or_number")]
    pub whatap_port: String,

    pub image_version: ImageVersion,
    pub install_method: InstallMethod,
    pub k8s_version: K8sVersion,
    pub container_runtime: ContainerRuntime,

    pub is_gke: bool,
    pub is_open_shift: bool,
    pub is_istio: bool,
    pub is_gpu: bool,

    /// Only honoured by the operator method.
    pub use_apm: bool,
    /// Only honoured by the operator method.
    pub use_open_metrics: bool,

    pub apm_targets: Vec<ApmTarget>,
    pub open_metrics_targets: Vec<OpenMetricsTarget>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            whatap_server: String::new(),
            whatap_port: DEFAULT_WHATAP_PORT.into(),
            image_version: ImageVersion::default(),
            install_method: InstallMethod::default(),
            k8s_version: K8sVersion::default(),
            container_runtime: ContainerRuntime::default(),
            is_gke: false,
            is_open_shift: false,
            is_istio: false,
            is_gpu: false,
            use_apm: false,
            use_open_metrics: false,
            apm_targets: vec![ApmTarget::sample()],
            open_metrics_targets: vec![OpenMetricsTarget::sample()],
        }
    }
}

impl Configuration {
    pub fn from_file(path: &Path) -> GuideResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GuideError::Config(format!("Cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML (or JSON, which YAML accepts).
    pub fn from_yaml_str(content: &str) -> GuideResult<Self> {
        serde_yaml::from_str(content).map_err(|e| GuideError::Config(format!("Invalid YAML: {e}")))
    }

    pub fn to_yaml(&self) -> GuideResult<String> {
        serde_yaml::to_string(self).map_err(|source| GuideError::Render {
            document: "configuration".into(),
            source,
        })
    }

    /// APM instrumentation blocks are produced.
    pub fn apm_active(&self) -> bool {
        self.use_apm && self.install_method == InstallMethod::Operator
    }

    /// Per-target OpenMetrics blocks are produced.
    pub fn open_metrics_active(&self) -> bool {
        self.use_open_metrics && self.install_method == InstallMethod::Operator
    }

    /// The open agent is deployed at all (GPU scraping or OpenMetrics).
    pub fn open_agent_requested(&self) -> bool {
        self.is_gpu || self.use_open_metrics
    }

    /// Runtime whose socket the node agent mounts. GKE nodes only run containerd.
    pub fn effective_runtime(&self) -> ContainerRuntime {
        if self.is_gke {
            ContainerRuntime::Containerd
        } else {
            self.container_runtime
        }
    }
}
