//! Error types for terraport-control.

use std::time::Duration;

use terraport_core::{ArtifactError, CredentialError};

/// Result type alias using [`ControlError`].
pub type ControlResult<T> = Result<T, ControlError>;

/// Broad classification of a [`ControlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, caught before any side effect.
    Validation,
    /// A template or credential bundle does not exist.
    NotFound,
    /// Another run for the same deployment is in flight.
    Conflict,
    /// The artifact store or remote host could not be reached.
    Transport,
    /// The runner broke its output contract.
    Protocol,
    /// The remote run exceeded its time limit.
    Timeout,
    /// Anything else.
    Internal,
}

/// Errors that can occur in the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Credential bundle rejected at submission.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// Deployment identifier is malformed.
    #[error("invalid deployment id: {0}")]
    InvalidDeploymentId(String),

    /// Upload is missing a required part or is malformed.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// No template stored for the deployment.
    #[error("template not found for deployment {0}")]
    TemplateMissing(String),

    /// No credentials registered for the deployment.
    #[error("credentials not found for deployment {0}")]
    CredentialsMissing(String),

    /// A deploy is already running for the deployment.
    #[error("deployment {0} is already in progress")]
    DeploymentInProgress(String),

    /// Artifact store failure.
    #[error(transparent)]
    ArtifactStore(#[from] ArtifactError),

    /// A remote command or file transfer failed.
    #[error("remote {operation} failed{}: {stderr}", exit_suffix(.exit_code))]
    RemoteExecution {
        /// What was being attempted.
        operation: String,
        /// Exit code, if the remote process ran at all.
        exit_code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The runner's stdout was not a valid result.
    #[error("runner result could not be parsed: {reason}")]
    ResultUnparseable {
        /// Parse failure.
        reason: String,
        /// Exit code of the remote command.
        exit_code: Option<i32>,
        /// Raw standard output.
        stdout: String,
        /// Raw standard error.
        stderr: String,
    },

    /// The remote run exceeded its time limit.
    #[error("remote run timed out after {}s", .limit.as_secs())]
    Timeout {
        /// Configured limit.
        limit: Duration,
    },

    /// Local staging failure.
    #[error("failed to stage files: {0}")]
    Staging(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ControlError {
    /// Create a remote execution error.
    #[must_use]
    pub fn remote(
        operation: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::RemoteExecution {
            operation: operation.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a staging error.
    #[must_use]
    pub fn staging(msg: impl ToString) -> Self {
        Self::Staging(msg.to_string())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Credentials(_) | Self::InvalidDeploymentId(_) | Self::InvalidUpload(_) => {
                ErrorKind::Validation
            }
            Self::TemplateMissing(_) | Self::CredentialsMissing(_) => ErrorKind::NotFound,
            Self::DeploymentInProgress(_) => ErrorKind::Conflict,
            Self::ArtifactStore(_) | Self::RemoteExecution { .. } => ErrorKind::Transport,
            Self::ResultUnparseable { .. } => ErrorKind::Protocol,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Staging(_) | Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

fn exit_suffix(exit_code: &Option<i32>) -> String {
    exit_code
        .map(|code| format!(" with exit code {code}"))
        .unwrap_or_default()
}

impl From<figment::Error> for ControlError {
    fn from(e: figment::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display() {
        let err = ControlError::remote("copy of creds.json", Some(1), "Permission denied");
        assert_eq!(
            err.to_string(),
            "remote copy of creds.json failed with exit code 1: Permission denied"
        );

        let err = ControlError::remote("mkdir", None, "ssh: connect to host: Connection refused");
        assert_eq!(
            err.to_string(),
            "remote mkdir failed: ssh: connect to host: Connection refused"
        );
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            ControlError::from(CredentialError::UnsupportedProvider("gcp".to_owned())).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ControlError::TemplateMissing("abc".to_owned()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ControlError::DeploymentInProgress("abc".to_owned()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ControlError::remote("run", Some(255), "").kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            ControlError::ResultUnparseable {
                reason: "EOF".to_owned(),
                exit_code: Some(137),
                stdout: String::new(),
                stderr: String::new(),
            }
            .kind(),
            ErrorKind::Protocol
        );
        assert_eq!(
            ControlError::Timeout {
                limit: Duration::from_secs(5)
            }
            .kind(),
            ErrorKind::Timeout
        );
    }
}
