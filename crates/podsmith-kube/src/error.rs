//! Error types for podsmith-kube

use thiserror::Error;

/// Result type for podsmith-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while reading deployed state
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Manifest could not be parsed
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Manifest holds no StatefulSet
    #[error("no StatefulSet found in {path}")]
    NoStatefulSet { path: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::InvalidManifest(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 404)
    }
}
