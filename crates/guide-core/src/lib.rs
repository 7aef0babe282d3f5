//! Configuration schema and output types for the WhaTap Kubernetes install guide.

pub mod choice;
pub mod collection;
pub mod config;
pub mod error;
pub mod output;
pub mod target;
pub mod validate;

pub use choice::{
    ContainerRuntime, ImageVersion, InstallMethod, K8sVersion, Language, MonitorType,
    RelabelAction, Scheme, SelectionMethod,
};
pub use collection::{Keyed, TargetList};
pub use config::Configuration;
pub use error::{GuideError, GuideResult};
pub use output::{GeneratedCommand, GeneratedFile, Syntax};
pub use target::{
    ApmTarget, Endpoint, LabelPair, MonitorKind, MonitorScope, NamespaceSelection,
    OpenMetricsTarget, RelabelRule,
};
pub use validate::ConfigWarning;
