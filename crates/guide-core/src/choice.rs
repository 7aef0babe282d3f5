//! Closed option sets chosen in the wizard.
//!
//! Every choice deserializes leniently: an unrecognised string falls back to
//! the documented default instead of failing the whole configuration.

use std::fmt;
use std::str::FromStr;

macro_rules! lenient_choice {
    (
        $(#[$meta:meta])*
        pub enum $name:ident (default = $default:ident) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        "unknown {} '{other}'",
                        stringify!($name)
                    )),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                value.parse().unwrap_or_else(|err: String| {
                    let fallback = Self::default();
                    tracing::warn!(error = %err, fallback = %fallback, "Falling back to default choice");
                    fallback
                })
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }
    };
}

lenient_choice! {
    /// Agent image channel.
    pub enum ImageVersion (default = Stable) {
        Stable => "stable",
        Preview => "preview",
    }
}

lenient_choice! {
    /// Packaging strategy used to deploy the agents.
    pub enum InstallMethod (default = Operator) {
        Operator => "operator",
        Helm => "helm",
        Yaml => "yaml",
    }
}

lenient_choice! {
    /// Cluster version band; selects workload and RBAC API versions.
    pub enum K8sVersion (default = Modern) {
        Modern => "1.16+",
        Legacy => "1.16-",
    }
}

lenient_choice! {
    pub enum ContainerRuntime (default = Containerd) {
        Containerd => "containerd",
        Docker => "docker",
        Crio => "crio",
    }
}

lenient_choice! {
    /// Application language instrumented by the APM agent.
    pub enum Language (default = Java) {
        Java => "java",
        Nodejs => "nodejs",
        Python => "python",
    }
}

lenient_choice! {
    /// How a target picks its namespaces. `Unspecified` selects nothing.
    pub enum SelectionMethod (default = Unspecified) {
        Name => "name",
        Label => "label",
        Unspecified => "",
    }
}

lenient_choice! {
    pub enum MonitorType (default = PodMonitor) {
        PodMonitor => "PodMonitor",
        ServiceMonitor => "ServiceMonitor",
        StaticEndpoints => "StaticEndpoints",
    }
}

lenient_choice! {
    pub enum Scheme (default = Http) {
        Http => "http",
        Https => "https",
    }
}

lenient_choice! {
    /// Prometheus relabel action. Only `replace` uses target label and replacement.
    pub enum RelabelAction (default = Keep) {
        Keep => "keep",
        Drop => "drop",
        Replace => "replace",
    }
}

impl ImageVersion {
    /// Container image tag published for this channel.
    pub fn image_tag(self) -> &'static str {
        match self {
            Self::Stable => "latest",
            Self::Preview => "preview",
        }
    }
}

impl ContainerRuntime {
    /// Host path of the runtime's API socket.
    pub fn socket_path(self) -> &'static str {
        match self {
            Self::Containerd => "/run/containerd/containerd.sock",
            Self::Docker => "/var/run/docker.sock",
            Self::Crio => "/var/run/crio/crio.sock",
        }
    }
}
