use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuideError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to render {document}: {source}")]
    Render {
        document: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid Kubernetes object in {document}: {source}")]
    Manifest {
        document: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type GuideResult<T> = Result<T, GuideError>;
