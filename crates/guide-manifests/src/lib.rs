//! Turns a [`Configuration`] into install documents and shell steps.
//!
//! Both entry points are pure: they never touch the filesystem or network and
//! return byte-identical output for the same input.

pub mod commands;
pub mod helm;
pub mod k8s;
pub mod operator;
pub mod platform;
pub mod relabel;
mod render;
pub mod selector;
pub mod standalone;

use tracing::{debug, warn};

use guide_core::{
    Configuration, GeneratedCommand, GeneratedFile, GuideResult, InstallMethod, Syntax,
};

pub use commands::build_commands;
pub use relabel::{compile_relabel_rules, RelabelConfig};
pub use selector::{build_label_selector, build_namespace_selector, LabelMap, SelectorSpec};

pub const AGENT_NAMESPACE: &str = "whatap-monitoring";
pub const CREDENTIALS_SECRET: &str = "whatap-credentials";
pub const AGENT_IMAGE: &str = "whatap/kube_mon";
pub const OPEN_AGENT_IMAGE: &str = "whatap/open_agent";
pub const INSTALL_SCRIPT: &str = "install.sh";

/// All documents for the configured install method, in apply order.
pub fn generate_files(config: &Configuration) -> GuideResult<Vec<GeneratedFile>> {
    for warning in config.warnings() {
        warn!(%warning, "configuration warning");
    }

    let files = match config.install_method {
        InstallMethod::Operator => operator::assemble(config)?,
        InstallMethod::Helm => helm::assemble(config)?,
        InstallMethod::Yaml => standalone::assemble(config)?,
    };
    for file in &files {
        debug!(name = %file.name, method = %file.method, bytes = file.content.len(), "Generated document");
    }
    Ok(files)
}

/// Shell steps for the configured install method, in execution order.
pub fn generate_commands(config: &Configuration) -> Vec<GeneratedCommand> {
    let commands = build_commands(config);
    for command in &commands {
        debug!(title = %command.title, method = %command.method, "Generated command");
    }
    commands
}

/// Bundle commands into one bash script that stops at the first failure.
pub fn install_script(commands: &[GeneratedCommand]) -> GeneratedFile {
    let method = commands
        .first()
        .map(|c| c.method)
        .unwrap_or_default();

    let mut content = String::from("#!/usr/bin/env bash\nset -euo pipefail\n");
    for command in commands {
        content.push('\n');
        content.push_str(&format!("# {}\n{}\n", command.title, command.command));
    }

    GeneratedFile {
        name: INSTALL_SCRIPT.into(),
        method,
        language: Syntax::Bash,
        content,
        description: Some(format!("Runs all {} steps in order", commands.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_script_keeps_command_order() {
        let commands = generate_commands(&Configuration::default());
        let script = install_script(&commands);

        assert_eq!(script.name, "install.sh");
        assert_eq!(script.language, Syntax::Bash);
        assert!(script.content.starts_with("#!/usr/bin/env bash\nset -euo pipefail\n"));

        let positions: Vec<usize> = commands
            .iter()
            .map(|c| script.content.find(&format!("# {}\n{}", c.title, c.command)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_command_list_yields_header_only() {
        let script = install_script(&[]);
        assert_eq!(script.content, "#!/usr/bin/env bash\nset -euo pipefail\n");
        assert_eq!(script.method, InstallMethod::Operator);
    }

    #[test]
    fn facade_dispatches_on_method() {
        for method in InstallMethod::ALL {
            let config = Configuration {
                install_method: *method,
                ..Configuration::default()
            };
            let files = generate_files(&config).unwrap();
            assert!(!files.is_empty());
            assert!(files.iter().all(|f| f.method == *method));
            assert!(generate_commands(&config).iter().all(|c| c.method == *method));
        }
    }
}
