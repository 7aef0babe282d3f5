use serde::{Deserialize, Serialize};

use crate::choice::InstallMethod;

/// Syntax of a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    Yaml,
    Bash,
}

/// A named text document for the operator to save and apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub name: String,
    pub method: InstallMethod,
    pub language: Syntax,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One shell step. Steps must run in the order they are returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCommand {
    pub title: String,
    pub method: InstallMethod,
    pub command: String,
}
