//! Typed Kubernetes objects for the agent workloads.
//!
//! Objects are built from JSON literals and parsed into `k8s-openapi` types,
//! so a misspelled field fails here instead of at `kubectl apply` time.

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use serde_yaml::Value;

use guide_core::{Configuration, GuideError, GuideResult};

use crate::platform::PlatformOverrides;
use crate::render::to_value;
use crate::{AGENT_IMAGE, AGENT_NAMESPACE, CREDENTIALS_SECRET, OPEN_AGENT_IMAGE};

pub const SERVICE_ACCOUNT: &str = "whatap";
pub const MASTER_AGENT: &str = "whatap-master-agent";
pub const NODE_AGENT: &str = "whatap-node-agent";
pub const OPEN_AGENT: &str = "whatap-open-agent";
pub const OPEN_AGENT_CONFIG: &str = "whatap-open-agent-config";
pub const SCRAPE_CONFIG_KEY: &str = "scrape_config.yaml";

/// Parse `raw` as `K`, then hand it back as YAML.
fn typed<K>(document: &str, raw: JsonValue) -> GuideResult<Value>
where
    K: DeserializeOwned + Serialize,
{
    let object: K = serde_json::from_value(raw).map_err(|source| GuideError::Manifest {
        document: document.to_string(),
        source,
    })?;
    to_value(document, &object)
}

/// Rewrite `apiVersion` for clusters older than the typed API.
pub(crate) fn with_api_version(mut object: Value, api_version: &str) -> Value {
    if let Some(map) = object.as_mapping_mut() {
        map.insert("apiVersion".into(), api_version.into());
    }
    object
}

fn credential_env() -> JsonValue {
    json!([
        { "name": "WHATAP_LICENSE", "valueFrom": { "secretKeyRef": { "name": CREDENTIALS_SECRET, "key": "license" } } },
        { "name": "WHATAP_HOST", "valueFrom": { "secretKeyRef": { "name": CREDENTIALS_SECRET, "key": "host" } } },
        { "name": "WHATAP_PORT", "valueFrom": { "secretKeyRef": { "name": CREDENTIALS_SECRET, "key": "port" } } },
    ])
}

fn pod_metadata(app: &str, platform: &PlatformOverrides) -> JsonValue {
    let mut metadata = json!({ "labels": { "name": app } });
    if let Some(annotations) = &platform.pod_annotations {
        metadata["annotations"] = annotations
            .iter()
            .map(|(k, v)| (k.to_string(), JsonValue::from(v)))
            .collect::<serde_json::Map<_, _>>()
            .into();
    }
    metadata
}

pub fn namespace() -> GuideResult<Value> {
    typed::<Namespace>(
        "namespace",
        json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": AGENT_NAMESPACE },
        }),
    )
}

pub fn credentials_secret(config: &Configuration) -> GuideResult<Value> {
    typed::<Secret>(
        CREDENTIALS_SECRET,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": CREDENTIALS_SECRET, "namespace": AGENT_NAMESPACE },
            "type": "Opaque",
            "stringData": {
                "license": config.access_key,
                "host": config.whatap_server,
                "port": config.whatap_port,
            },
        }),
    )
}

/// ServiceAccount, ClusterRole and binding shared by all agent pods.
pub fn rbac(platform: &PlatformOverrides) -> GuideResult<Vec<Value>> {
    let account = typed::<ServiceAccount>(
        SERVICE_ACCOUNT,
        json!({
            "apiVersion": "v1",
            "kind": "ServiceAccount",
            "metadata": { "name": SERVICE_ACCOUNT, "namespace": AGENT_NAMESPACE },
        }),
    )?;
    let role = typed::<ClusterRole>(
        SERVICE_ACCOUNT,
        json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRole",
            "metadata": { "name": SERVICE_ACCOUNT },
            "rules": [
                {
                    "apiGroups": ["*"],
                    "resources": [
                        "namespaces", "pods", "pods/log", "nodes", "nodes/stats", "nodes/proxy",
                        "services", "endpoints", "events", "configmaps", "deployments",
                        "daemonsets", "statefulsets", "replicasets", "persistentvolumeclaims",
                        "persistentvolumes", "ingresses", "jobs", "cronjobs",
                    ],
                    "verbs": ["get", "list", "watch"],
                },
                { "nonResourceURLs": ["/metrics"], "verbs": ["get"] },
            ],
        }),
    )?;
    let binding = typed::<ClusterRoleBinding>(
        SERVICE_ACCOUNT,
        json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRoleBinding",
            "metadata": { "name": SERVICE_ACCOUNT },
            "roleRef": {
                "apiGroup": "rbac.authorization.k8s.io",
                "kind": "ClusterRole",
                "name": SERVICE_ACCOUNT,
            },
            "subjects": [
                { "kind": "ServiceAccount", "name": SERVICE_ACCOUNT, "namespace": AGENT_NAMESPACE },
            ],
        }),
    )?;

    Ok(vec![
        account,
        with_api_version(role, platform.rbac_api_version),
        with_api_version(binding, platform.rbac_api_version),
    ])
}

pub fn master_agent(platform: &PlatformOverrides) -> GuideResult<Value> {
    let deployment = typed::<Deployment>(
        MASTER_AGENT,
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": MASTER_AGENT, "namespace": AGENT_NAMESPACE },
            "spec": {
                "replicas": 1,
                "selector": { "matchLabels": { "name": MASTER_AGENT } },
                "template": {
                    "metadata": pod_metadata(MASTER_AGENT, platform),
                    "spec": {
                        "serviceAccountName": SERVICE_ACCOUNT,
                        "containers": [{
                            "name": MASTER_AGENT,
                            "image": format!("{AGENT_IMAGE}:{}", platform.image_tag),
                            "imagePullPolicy": "Always",
                            "command": ["/bin/entrypoint.sh"],
                            "env": credential_env(),
                            "ports": [{ "containerPort": 6600, "name": "master" }],
                            "resources": {
                                "requests": { "cpu": "100m", "memory": "300Mi" },
                                "limits": { "cpu": "200m", "memory": "350Mi" },
                            },
                        }],
                    },
                },
            },
        }),
    )?;
    Ok(with_api_version(deployment, platform.workload_api_version))
}

pub fn node_agent(platform: &PlatformOverrides) -> GuideResult<Value> {
    let socket = platform.runtime_socket_path;
    let mut container = json!({
        "name": NODE_AGENT,
        "image": format!("{AGENT_IMAGE}:{}", platform.image_tag),
        "imagePullPolicy": "Always",
        "command": ["/data/agent/node/cadvisor_helper", "-port", "6801"],
        "env": credential_env(),
        "ports": [{ "containerPort": 6801, "name": "helperport" }],
        "resources": {
            "requests": { "cpu": "100m", "memory": "100Mi" },
            "limits": { "cpu": "200m", "memory": "350Mi" },
        },
        "volumeMounts": [
            { "name": "runtimesock", "mountPath": socket },
            { "name": "rootfs", "mountPath": "/rootfs", "readOnly": true },
        ],
    });
    if let Some(context) = platform.security_context {
        container["securityContext"] = json!({
            "privileged": context.privileged,
            "runAsUser": context.run_as_user,
        });
    }
    if let Some(env) = container["env"].as_array_mut() {
        env.push(json!({
            "name": "NODE_IP",
            "valueFrom": { "fieldRef": { "fieldPath": "status.hostIP" } },
        }));
    }

    let daemon_set = typed::<DaemonSet>(
        NODE_AGENT,
        json!({
            "apiVersion": "apps/v1",
            "kind": "DaemonSet",
            "metadata": { "name": NODE_AGENT, "namespace": AGENT_NAMESPACE },
            "spec": {
                "selector": { "matchLabels": { "name": NODE_AGENT } },
                "template": {
                    "metadata": pod_metadata(NODE_AGENT, platform),
                    "spec": {
                        "serviceAccountName": SERVICE_ACCOUNT,
                        "tolerations": [{ "key": "node-role.kubernetes.io/master", "effect": "NoSchedule" }],
                        "containers": [container],
                        "volumes": [
                            { "name": "runtimesock", "hostPath": { "path": socket } },
                            { "name": "rootfs", "hostPath": { "path": "/" } },
                        ],
                    },
                },
            },
        }),
    )?;
    Ok(with_api_version(daemon_set, platform.workload_api_version))
}

/// ConfigMap carrying the open agent's scrape configuration.
pub fn open_agent_config(scrape_config: &str) -> GuideResult<Value> {
    typed::<ConfigMap>(
        OPEN_AGENT_CONFIG,
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": { "name": OPEN_AGENT_CONFIG, "namespace": AGENT_NAMESPACE },
            "data": { SCRAPE_CONFIG_KEY: scrape_config },
        }),
    )
}

pub fn open_agent(platform: &PlatformOverrides) -> GuideResult<Value> {
    let deployment = typed::<Deployment>(
        OPEN_AGENT,
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": OPEN_AGENT, "namespace": AGENT_NAMESPACE },
            "spec": {
                "replicas": 1,
                "selector": { "matchLabels": { "name": OPEN_AGENT } },
                "template": {
                    "metadata": pod_metadata(OPEN_AGENT, platform),
                    "spec": {
                        "serviceAccountName": SERVICE_ACCOUNT,
                        "containers": [{
                            "name": OPEN_AGENT,
                            "image": format!("{OPEN_AGENT_IMAGE}:latest"),
                            "imagePullPolicy": "Always",
                            "env": credential_env(),
                            "volumeMounts": [
                                { "name": "scrape-config", "mountPath": "/app/config" },
                            ],
                        }],
                        "volumes": [
                            { "name": "scrape-config", "configMap": { "name": OPEN_AGENT_CONFIG } },
                        ],
                    },
                },
            },
        }),
    )?;
    Ok(with_api_version(deployment, platform.workload_api_version))
}
