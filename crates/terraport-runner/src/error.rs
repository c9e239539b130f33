//! Error types for the provisioning runner.

use std::path::PathBuf;

use terraport_core::result::TOOL_FAILURE_MESSAGE;
use terraport_core::{CredentialError, ProvisioningResult};
use thiserror::Error;

use crate::tool::Stage;

/// Result type alias using [`RunnerError`].
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that abort a provisioning run.
///
/// None of these escape the runner as a crash: each one is converted into a
/// failed [`ProvisioningResult`] with [`RunnerError::into_result`].
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The template archive could not be unpacked.
    #[error("failed to unpack {path}: {message}")]
    Unpack {
        /// Archive path.
        path: PathBuf,
        /// Underlying diagnostic.
        message: String,
    },

    /// The credential file could not be read.
    #[error("failed to read credentials from {path}: {source}")]
    CredentialsRead {
        /// Credential file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The credential file was read but is not a usable bundle.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// The provisioning tool could not be started.
    #[error("failed to spawn {stage} stage: {message}")]
    Spawn {
        /// Stage being started.
        stage: Stage,
        /// Underlying diagnostic.
        message: String,
    },

    /// A provisioning tool stage exited non-zero.
    #[error("{stage} stage failed with exit code {exit_code}")]
    StageFailed {
        /// Stage that failed.
        stage: Stage,
        /// Exit code reported by the tool.
        exit_code: i32,
        /// Captured diagnostic text.
        diagnostic: String,
    },

    /// The output stage succeeded but its JSON could not be decoded.
    #[error("failed to parse tool outputs: {0}")]
    OutputsUnparseable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RunnerError {
    /// Create an unpack error.
    #[must_use]
    pub fn unpack(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Unpack {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Convert into the failed result reported to the orchestrator.
    #[must_use]
    pub fn into_result(self) -> ProvisioningResult {
        match &self {
            Self::Unpack { .. } => {
                ProvisioningResult::failed("Failed to unpack template.", self.to_string())
            }
            Self::Credentials(CredentialError::UnsupportedProvider(_)) => {
                ProvisioningResult::failed("Unsupported provider", self.to_string())
            }
            Self::CredentialsRead { .. } | Self::Credentials(_) => {
                ProvisioningResult::failed("Invalid credentials.", self.to_string())
            }
            Self::StageFailed { diagnostic, .. } => {
                ProvisioningResult::failed(TOOL_FAILURE_MESSAGE, diagnostic.clone())
            }
            Self::Spawn { .. } | Self::OutputsUnparseable(_) => {
                ProvisioningResult::failed(TOOL_FAILURE_MESSAGE, self.to_string())
            }
            Self::Config(_) => ProvisioningResult::failed("Runner setup failed.", self.to_string()),
        }
    }
}

impl From<figment::Error> for RunnerError {
    fn from(e: figment::Error) -> Self {
        Self::Config(e.to_string())
    }
}
