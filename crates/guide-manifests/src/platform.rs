//! Platform-specific agent settings shared by every install method.
//!
//! Each platform flag owns a distinct field, so any combination of flags
//! applies without conflicts.

use serde::Serialize;

use guide_core::{Configuration, ContainerRuntime, K8sVersion};

use crate::selector::LabelMap;

pub const ISTIO_INJECT_ANNOTATION: &str = "sidecar.istio.io/inject";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSecurityContext {
    pub privileged: bool,
    pub run_as_user: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformOverrides {
    pub image_tag: &'static str,
    /// Runtime after the GKE override.
    pub runtime: ContainerRuntime,
    pub runtime_socket_path: &'static str,
    /// OpenShift runs the node agent privileged as root.
    pub security_context: Option<AgentSecurityContext>,
    /// Istio: keep the sidecar out of agent pods.
    pub pod_annotations: Option<LabelMap>,
    pub workload_api_version: &'static str,
    pub rbac_api_version: &'static str,
}

impl PlatformOverrides {
    pub fn for_config(config: &Configuration) -> Self {
        let runtime = config.effective_runtime();
        let security_context = config.is_open_shift.then_some(AgentSecurityContext {
            privileged: true,
            run_as_user: 0,
        });
        let pod_annotations = config.is_istio.then(|| {
            let mut annotations = LabelMap::default();
            annotations.insert(ISTIO_INJECT_ANNOTATION, "false");
            annotations
        });
        let (workload_api_version, rbac_api_version) = match config.k8s_version {
            K8sVersion::Modern => ("apps/v1", "rbac.authorization.k8s.io/v1"),
            K8sVersion::Legacy => ("extensions/v1beta1", "rbac.authorization.k8s.io/v1beta1"),
        };

        Self {
            image_tag: config.image_version.image_tag(),
            runtime,
            runtime_socket_path: runtime.socket_path(),
            security_context,
            pod_annotations,
            workload_api_version,
            rbac_api_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guide_core::ImageVersion;

    #[test]
    fn defaults_have_no_overrides() {
        let overrides = PlatformOverrides::for_config(&Configuration::default());
        assert_eq!(overrides.image_tag, "latest");
        assert_eq!(overrides.runtime_socket_path, "/run/containerd/containerd.sock");
        assert!(overrides.security_context.is_none());
        assert!(overrides.pod_annotations.is_none());
        assert_eq!(overrides.workload_api_version, "apps/v1");
    }

    #[test]
    fn platform_flags_compose() {
        let config = Configuration {
            image_version: ImageVersion::Preview,
            container_runtime: ContainerRuntime::Crio,
            k8s_version: K8sVersion::Legacy,
            is_gke: true,
            is_open_shift: true,
            is_istio: true,
            ..Configuration::default()
        };
        let overrides = PlatformOverrides::for_config(&config);

        assert_eq!(overrides.image_tag, "preview");
        assert_eq!(overrides.runtime, ContainerRuntime::Containerd);
        assert_eq!(
            overrides.security_context,
            Some(AgentSecurityContext {
                privileged: true,
                run_as_user: 0
            })
        );
        assert_eq!(
            overrides
                .pod_annotations
                .as_ref()
                .and_then(|a| a.get(ISTIO_INJECT_ANNOTATION)),
            Some("false")
        );
        assert_eq!(overrides.workload_api_version, "extensions/v1beta1");
        assert_eq!(overrides.rbac_api_version, "rbac.authorization.k8s.io/v1beta1");
    }

    #[test]
    fn docker_socket_without_gke() {
        let config = Configuration {
            container_runtime: ContainerRuntime::Docker,
            ..Configuration::default()
        };
        assert_eq!(
            PlatformOverrides::for_config(&config).runtime_socket_path,
            "/var/run/docker.sock"
        );
    }
}
