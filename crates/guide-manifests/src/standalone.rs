//! Plain-manifest method: one file per workload, applied with `kubectl`.
//!
//! Only the core agents plus GPU scraping are deployable this way. User
//! OpenMetrics targets and APM instrumentation need the operator's CRDs and
//! are never rendered here.

use guide_core::{Configuration, GeneratedFile, GuideResult, InstallMethod, Syntax};

use crate::k8s;
use crate::operator::open_agent_section;
use crate::platform::PlatformOverrides;
use crate::render::{multi_document, to_yaml};
use crate::AGENT_NAMESPACE;

pub const CREDENTIALS_FILE: &str = "whatap-credentials.yaml";
pub const MASTER_AGENT_FILE: &str = "whatap-master-agent.yaml";
pub const NODE_AGENT_FILE: &str = "whatap-node-agent.yaml";
pub const OPEN_AGENT_FILE: &str = "whatap-open-agent.yaml";

/// Files in the order they must be applied.
pub fn manifest_names(config: &Configuration) -> Vec<&'static str> {
    let mut names = vec![CREDENTIALS_FILE, MASTER_AGENT_FILE, NODE_AGENT_FILE];
    if config.open_agent_requested() {
        names.push(OPEN_AGENT_FILE);
    }
    names
}

fn file(name: &str, content: String, description: String) -> GeneratedFile {
    GeneratedFile {
        name: name.into(),
        method: InstallMethod::Yaml,
        language: Syntax::Yaml,
        content,
        description: Some(description),
    }
}

fn open_agent_description(config: &Configuration) -> String {
    let mut description = String::from("Open agent deployment and scrape configuration");
    if config.is_gpu {
        description.push_str(" with DCGM exporter GPU scraping");
    }
    if config.use_open_metrics {
        description.push_str(
            ". OpenMetrics targets are not included; install with the operator method to scrape them",
        );
    }
    description
}

pub fn assemble(config: &Configuration) -> GuideResult<Vec<GeneratedFile>> {
    let platform = PlatformOverrides::for_config(config);

    let mut master = k8s::rbac(&platform)?;
    master.push(k8s::master_agent(&platform)?);

    let mut files = vec![
        file(
            CREDENTIALS_FILE,
            multi_document(
                CREDENTIALS_FILE,
                &[k8s::namespace()?, k8s::credentials_secret(config)?],
            )?,
            format!("Namespace {AGENT_NAMESPACE} and the agent credentials secret"),
        ),
        file(
            MASTER_AGENT_FILE,
            multi_document(MASTER_AGENT_FILE, &master)?,
            "Service account, cluster role and the master agent deployment".into(),
        ),
        file(
            NODE_AGENT_FILE,
            multi_document(NODE_AGENT_FILE, &[k8s::node_agent(&platform)?])?,
            format!(
                "Node agent daemon set mounting {}",
                platform.runtime_socket_path
            ),
        ),
    ];

    if config.open_agent_requested() {
        // User targets are only deployable through the operator.
        let scrape_config = match open_agent_section(config.is_gpu, config.use_open_metrics, &[]) {
            Some(mut section) => {
                section.targets.get_or_insert_with(Vec::new);
                to_yaml(OPEN_AGENT_FILE, &section)?
            }
            None => String::new(),
        };
        let objects = [
            k8s::open_agent_config(&scrape_config)?,
            k8s::open_agent(&platform)?,
        ];
        files.push(file(
            OPEN_AGENT_FILE,
            multi_document(OPEN_AGENT_FILE, &objects)?,
            open_agent_description(config),
        ));
    }

    Ok(files)
}
