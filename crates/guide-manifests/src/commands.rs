//! Ordered shell steps per install method.
//!
//! Later steps assume earlier ones succeeded, so the list is returned in
//! execution order and must not be reordered.

use guide_core::{Configuration, GeneratedCommand, InstallMethod};

use crate::{helm, operator, standalone, AGENT_NAMESPACE};

pub const HELM_REPO_NAME: &str = "whatap";
pub const HELM_REPO_URL: &str = "https://whatap.github.io/helm/";
pub const OPERATOR_RELEASE: &str = "whatap-operator";
pub const AGENT_RELEASE: &str = "whatap-agent";

fn step(method: InstallMethod, title: impl Into<String>, command: impl Into<String>) -> GeneratedCommand {
    GeneratedCommand {
        title: title.into(),
        method,
        command: command.into(),
    }
}

fn repo_setup() -> String {
    format!("helm repo add {HELM_REPO_NAME} {HELM_REPO_URL} && helm repo update")
}

fn verify(method: InstallMethod) -> GeneratedCommand {
    step(
        method,
        "Verify agent pods",
        format!("kubectl get pods -n {AGENT_NAMESPACE}"),
    )
}

fn operator_steps() -> Vec<GeneratedCommand> {
    let method = InstallMethod::Operator;
    vec![
        step(
            method,
            "Create namespace",
            format!("kubectl create namespace {AGENT_NAMESPACE} || true"),
        ),
        step(
            method,
            "Create access key secret",
            format!("kubectl apply -f {}", operator::CREDENTIALS_FILE),
        ),
        step(
            method,
            "Install WhaTap operator",
            format!(
                "{} && helm upgrade --install {OPERATOR_RELEASE} {HELM_REPO_NAME}/{OPERATOR_RELEASE} --namespace {AGENT_NAMESPACE}",
                repo_setup()
            ),
        ),
        step(
            method,
            "Apply WhatapAgent custom resource",
            format!("kubectl apply -f {}", operator::CR_FILE),
        ),
        verify(method),
    ]
}

fn helm_steps() -> Vec<GeneratedCommand> {
    let method = InstallMethod::Helm;
    vec![
        step(method, "Add Helm repository", repo_setup()),
        step(
            method,
            "Install agent chart",
            format!(
                "helm upgrade --install {AGENT_RELEASE} {HELM_REPO_NAME}/{AGENT_RELEASE} --namespace {AGENT_NAMESPACE} --create-namespace -f {}",
                helm::VALUES_FILE
            ),
        ),
        verify(method),
    ]
}

fn yaml_steps(config: &Configuration) -> Vec<GeneratedCommand> {
    let method = InstallMethod::Yaml;
    standalone::manifest_names(config)
        .into_iter()
        .map(|name| step(method, format!("Apply {name}"), format!("kubectl apply -f {name}")))
        .chain(std::iter::once(verify(method)))
        .collect()
}

pub fn build_commands(config: &Configuration) -> Vec<GeneratedCommand> {
    match config.install_method {
        InstallMethod::Operator => operator_steps(),
        InstallMethod::Helm => helm_steps(),
        InstallMethod::Yaml => yaml_steps(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(commands: &[GeneratedCommand]) -> Vec<&str> {
        commands.iter().map(|c| c.title.as_str()).collect()
    }

    #[test]
    fn operator_creates_namespace_before_secret_before_cr() {
        let commands = build_commands(&Configuration::default());
        assert_eq!(
            titles(&commands),
            [
                "Create namespace",
                "Create access key secret",
                "Install WhaTap operator",
                "Apply WhatapAgent custom resource",
                "Verify agent pods",
            ]
        );
        assert!(commands[0].command.ends_with("|| true"));
        assert!(commands[2].command.contains("whatap/whatap-operator"));
        assert!(commands.iter().all(|c| c.method == InstallMethod::Operator));
    }

    #[test]
    fn helm_references_the_values_file() {
        let config = Configuration {
            install_method: InstallMethod::Helm,
            ..Configuration::default()
        };
        let commands = build_commands(&config);
        assert_eq!(commands.len(), 3);
        assert!(commands[0].command.starts_with("helm repo add whatap"));
        assert!(commands[1].command.ends_with("-f whatap-agent-values.yaml"));
    }

    #[test]
    fn yaml_applies_each_manifest_in_generation_order() {
        let config = Configuration {
            install_method: InstallMethod::Yaml,
            is_gpu: true,
            ..Configuration::default()
        };
        let commands = build_commands(&config);
        let applied: Vec<_> = commands
            .iter()
            .filter_map(|c| c.command.strip_prefix("kubectl apply -f "))
            .collect();
        assert_eq!(applied, standalone::manifest_names(&config));
        assert_eq!(applied.len(), 4);
        assert_eq!(commands.last().map(|c| c.title.as_str()), Some("Verify agent pods"));
    }
}
