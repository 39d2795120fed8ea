//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use podsmith_core::CoreError;
use podsmith_engine::EngineError;
use podsmith_kube::KubeError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Values could not be loaded, parsed or decoded
    #[error("Invalid values: {message}")]
    #[diagnostic(code(podsmith::cli::values))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The StatefulSet could not be composed
    #[error("Render failed: {message}")]
    #[diagnostic(code(podsmith::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Deployed state could not be read
    #[error("Existing state: {message}")]
    #[diagnostic(code(podsmith::cli::existing))]
    Existing { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(podsmith::cli::io))]
    Io { message: String },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(podsmith::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Existing { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            other => CliError::Validation {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        let help = err.help().map(|h| h.to_string());
        match err {
            EngineError::Values(core) => core.into(),
            other => CliError::Render {
                message: other.to_string(),
                help,
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Io(e) => e.into(),
            other => CliError::Existing {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use podsmith_engine::SecurityField;

    #[test]
    fn test_missing_security_context_is_render_error() {
        let err: CliError =
            EngineError::missing_security_context("set-datadir-ownership", SecurityField::FsGroup)
                .into();

        assert_eq!(err.exit_code(), exit_codes::RENDER_ERROR);
        assert!(err.to_string().contains("set-datadir-ownership"));
        assert!(err.help().is_some());
    }

    #[test]
    fn test_values_error_is_validation() {
        let core = CoreError::ValuesMerge {
            message: "Invalid values path: 'a..b'".to_string(),
        };
        let err: CliError = EngineError::Values(core).into();
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_ERROR);
    }

    #[test]
    fn test_io_exit_code() {
        let err: CliError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }
}
