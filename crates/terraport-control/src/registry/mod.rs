//! Credential registry.
//!
//! Maps a deployment to the credential bundle it was submitted with. The
//! registry is injected into the orchestrator so that a durable store can
//! replace the in-memory one without touching orchestration logic.

mod memory;

pub use memory::MemoryRegistry;

use async_trait::async_trait;
use terraport_core::{CredentialBundle, DeploymentId};

/// Storage for submitted credential bundles.
#[async_trait]
pub trait CredentialRegistry: Send + Sync {
    /// Store a bundle, replacing any previous bundle for the deployment.
    async fn put(&self, id: &DeploymentId, bundle: CredentialBundle);

    /// Fetch the bundle for a deployment.
    async fn get(&self, id: &DeploymentId) -> Option<CredentialBundle>;
}
