//! Artifact storage using object_store.
//!
//! Supports in-memory, local filesystem and S3 backends.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ArtifactError, ArtifactResult};

use super::{ArtifactKey, ArtifactStore};

/// Backend type for artifact storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Process-local store, lost on exit.
    Memory,
    /// Directory on the local filesystem.
    #[default]
    Local,
    /// S3 or an S3-compatible service.
    S3,
}

impl StoreType {
    /// Configuration name of the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local => "local",
            Self::S3 => "s3",
        }
    }
}

/// Configuration for artifact storage.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Storage backend.
    #[serde(default)]
    pub storage_type: StoreType,
    /// Root directory (local) or bucket name (S3).
    #[serde(default = "default_store_path")]
    pub path: String,
    /// S3 region.
    pub region: Option<String>,
    /// S3 endpoint (for S3-compatible stores).
    pub endpoint: Option<String>,
    /// S3 access key ID. Falls back to the environment when unset.
    pub access_key_id: Option<String>,
    /// S3 secret access key. Falls back to the environment when unset.
    pub secret_access_key: Option<String>,
}

fn default_store_path() -> String {
    "/var/lib/terraport/artifacts".to_owned()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_type: StoreType::default(),
            path: default_store_path(),
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl StoreConfig {
    /// Configuration for an in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            storage_type: StoreType::Memory,
            ..Self::default()
        }
    }
}

/// [`ArtifactStore`] backed by an [`ObjectStore`].
pub struct ObjectArtifactStore {
    store: Arc<dyn ObjectStore>,
}

impl ObjectArtifactStore {
    /// Create an artifact store from configuration.
    pub fn new(config: &StoreConfig) -> ArtifactResult<Self> {
        Ok(Self {
            store: create_object_store(config)?,
        })
    }

    /// Create an artifact store over a pre-configured object store.
    #[must_use]
    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl std::fmt::Debug for ObjectArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectArtifactStore")
            .field("store", &self.store.to_string())
            .finish()
    }
}

#[async_trait]
impl ArtifactStore for ObjectArtifactStore {
    async fn put(&self, key: &ArtifactKey, data: Bytes) -> ArtifactResult<()> {
        let path = ObjectPath::from(key.object_path());

        debug!(key = %path, size = data.len(), "uploading artifact");
        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| ArtifactError::unavailable(path.as_ref(), e))?;

        Ok(())
    }

    async fn get(&self, key: &ArtifactKey) -> ArtifactResult<Option<Bytes>> {
        let path = ObjectPath::from(key.object_path());

        let result = match self.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                debug!(key = %path, "artifact not found");
                return Ok(None);
            }
            Err(e) => return Err(ArtifactError::unavailable(path.as_ref(), e)),
        };

        let data = result
            .bytes()
            .await
            .map_err(|e| ArtifactError::unavailable(path.as_ref(), e))?;

        debug!(key = %path, size = data.len(), "artifact downloaded");
        Ok(Some(data))
    }
}

/// Create an object store from configuration.
fn create_object_store(config: &StoreConfig) -> ArtifactResult<Arc<dyn ObjectStore>> {
    match config.storage_type {
        StoreType::Memory => Ok(Arc::new(object_store::memory::InMemory::new())),
        StoreType::Local => {
            std::fs::create_dir_all(&config.path).map_err(|e| {
                ArtifactError::Config(format!("failed to create {}: {e}", config.path))
            })?;
            let store = object_store::local::LocalFileSystem::new_with_prefix(&config.path)
                .map_err(|e| {
                    ArtifactError::Config(format!("failed to create local store: {e}"))
                })?;
            Ok(Arc::new(store))
        }
        StoreType::S3 => {
            use object_store::aws::AmazonS3Builder;

            let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.path);

            if let Some(region) = &config.region {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = &config.endpoint {
                builder = builder
                    .with_endpoint(endpoint)
                    .with_allow_http(endpoint.starts_with("http://"));
            }
            if let Some(key_id) = &config.access_key_id {
                builder = builder.with_access_key_id(key_id);
            }
            if let Some(secret) = &config.secret_access_key {
                builder = builder.with_secret_access_key(secret);
            }

            let store = builder
                .build()
                .map_err(|e| ArtifactError::Config(format!("failed to create S3 store: {e}")))?;
            Ok(Arc::new(store))
        }
    }
}
