//! Artifact store gateway.
//!
//! Artifacts are opaque blobs addressed by deployment identifier and kind.
//! The key layout is shared with anything else reading the bucket, so it
//! must not change.

mod storage;

pub use storage::{ObjectArtifactStore, StoreConfig, StoreType};

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ArtifactResult;
use crate::types::DeploymentId;

/// Kind of artifact stored for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The submitted template archive.
    Template,
    /// Apply-stage log with control sequences stripped.
    Log,
    /// Diagnostic text from a failed stage.
    ErrorLog,
    /// JSON outputs of a successful run.
    Outputs,
}

impl ArtifactKind {
    /// Get the kind name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Log => "log",
            Self::ErrorLog => "error-log",
            Self::Outputs => "outputs",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Address of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    deployment_id: DeploymentId,
    kind: ArtifactKind,
}

impl ArtifactKey {
    /// Create a key.
    #[must_use]
    pub const fn new(deployment_id: DeploymentId, kind: ArtifactKind) -> Self {
        Self {
            deployment_id,
            kind,
        }
    }

    /// Key for the template archive.
    #[must_use]
    pub fn template(id: &DeploymentId) -> Self {
        Self::new(id.clone(), ArtifactKind::Template)
    }

    /// Key for the apply log.
    #[must_use]
    pub fn log(id: &DeploymentId) -> Self {
        Self::new(id.clone(), ArtifactKind::Log)
    }

    /// Key for the error log.
    #[must_use]
    pub fn error_log(id: &DeploymentId) -> Self {
        Self::new(id.clone(), ArtifactKind::ErrorLog)
    }

    /// Key for the outputs document.
    #[must_use]
    pub fn outputs(id: &DeploymentId) -> Self {
        Self::new(id.clone(), ArtifactKind::Outputs)
    }

    /// The deployment this artifact belongs to.
    #[must_use]
    pub const fn deployment_id(&self) -> &DeploymentId {
        &self.deployment_id
    }

    /// The artifact kind.
    #[must_use]
    pub const fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Object path within the store.
    #[must_use]
    pub fn object_path(&self) -> String {
        let id = &self.deployment_id;
        match self.kind {
            ArtifactKind::Template => format!("templates/{id}/template.zip"),
            ArtifactKind::Log => format!("logs/{id}/terraform.log"),
            ArtifactKind::ErrorLog => format!("logs/{id}/error.log"),
            ArtifactKind::Outputs => format!("outputs/{id}/outputs.json"),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.object_path())
    }
}

/// Uniform put/get access to the artifact store.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write an artifact, replacing any existing object at the key.
    async fn put(&self, key: &ArtifactKey, data: Bytes) -> ArtifactResult<()>;

    /// Read an artifact.
    ///
    /// Returns `None` if no object exists at the key. Store failures are
    /// reported as errors, never as `None`.
    async fn get(&self, key: &ArtifactKey) -> ArtifactResult<Option<Bytes>>;
}
