//! In-memory credential registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use terraport_core::{CredentialBundle, DeploymentId};
use tokio::sync::RwLock;
use tracing::debug;

use super::CredentialRegistry;

/// Process-lifetime credential registry.
///
/// Contents are lost on restart. A deploy issued after a restart for an
/// earlier submission fails with `CredentialsMissing`.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    bundles: Arc<RwLock<HashMap<DeploymentId, CredentialBundle>>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.bundles.read().await.len()
    }
}

#[async_trait]
impl CredentialRegistry for MemoryRegistry {
    async fn put(&self, id: &DeploymentId, bundle: CredentialBundle) {
        debug!(deployment_id = %id, provider = %bundle.provider(), "registering credentials");
        self.bundles.write().await.insert(id.clone(), bundle);
    }

    async fn get(&self, id: &DeploymentId) -> Option<CredentialBundle> {
        self.bundles.read().await.get(id).cloned()
    }
}
