//! Cluster access error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KubeError {
    #[error("failed to read kubeconfig {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write kubeconfig {path}: {source}")]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid kubeconfig: {0}")]
    InvalidConfig(#[from] serde_yaml::Error),

    #[error("malformed kubeconfig: {0}")]
    MalformedConfig(String),

    #[error("context not found in kubeconfig: {0}")]
    UnknownContext(String),

    #[error("cannot select context {0} from a KUBECONFIG list of several files")]
    MergedContext(String),

    #[error("invalid kubectl arguments: {0}")]
    InvalidArguments(String),

    #[error("kubectl error: {0}")]
    Kubectl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type KubeResult<T> = Result<T, KubeError>;
