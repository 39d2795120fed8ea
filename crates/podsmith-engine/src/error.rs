//! Engine error types

use miette::Diagnostic;
use podsmith_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Security context field that a container could not resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityField {
    RunAsUser,
    FsGroup,
}

impl std::fmt::Display for SecurityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RunAsUser => "runAsUser",
            Self::FsGroup => "fsGroup",
        };
        write!(f, "{}", s)
    }
}

/// Errors that abort a render
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EngineError {
    /// A container needs a uid/gid that no configuration level provides
    #[error("{container} container requires {field} to be specified")]
    #[diagnostic(
        code(podsmith::render::missing_security_context),
        help("set it under statefulset.podSecurityContext or statefulset.securityContext")
    )]
    MissingSecurityContext {
        container: String,
        field: SecurityField,
    },

    /// A container mounts a volume the pod does not declare
    #[error("container '{container}' mounts '{mount}' but no volume with that name is declared")]
    #[diagnostic(
        code(podsmith::render::unknown_volume_mount),
        help("add the volume to statefulset.extraVolumes or fix the mount name")
    )]
    UnknownVolumeMount { container: String, mount: String },

    /// A hostPath tiered cache was requested without a path
    #[error("tiered storage volume '{volume}' is a hostPath but no host path is set")]
    #[diagnostic(
        code(podsmith::render::missing_host_path),
        help("set storage.tiered.hostPath or pick another storage.tiered.mountType")
    )]
    MissingHostPath { volume: String },

    /// The configuration snapshot could not be built
    #[error("invalid values: {0}")]
    #[diagnostic(code(podsmith::render::values))]
    Values(#[from] CoreError),
}

impl EngineError {
    pub fn missing_security_context(container: &str, field: SecurityField) -> Self {
        Self::MissingSecurityContext {
            container: container.to_string(),
            field,
        }
    }
}
