//! Terraport shared types.
//!
//! This crate holds the vocabulary shared by the control service and the
//! in-container provisioning runner:
//!
//! - **Identifiers**: [`DeploymentId`] and the [`Provider`] tag
//! - **Credentials**: the provider-tagged [`CredentialBundle`]
//! - **Results**: [`ProvisioningResult`] and the output summary renderer
//! - **Artifacts**: the [`ArtifactKey`] layout and the [`ArtifactStore`]
//!   gateway over an `object_store` backend
//!
//! # Artifact layout
//!
//! Every artifact for a deployment lives under a path namespaced by its
//! identifier:
//!
//! ```text
//! templates/{id}/template.zip
//! logs/{id}/terraform.log
//! logs/{id}/error.log
//! outputs/{id}/outputs.json
//! ```

#![forbid(unsafe_code)]

pub mod artifact;
pub mod credentials;
pub mod error;
pub mod result;
pub mod types;

pub use artifact::{
    ArtifactKey, ArtifactKind, ArtifactStore, ObjectArtifactStore, StoreConfig, StoreType,
};
pub use credentials::{CredentialBundle, CredentialFields, SecretField};
pub use error::{ArtifactError, ArtifactResult, CredentialError};
pub use result::{render_summary, OutputValue, Outputs, ProvisioningResult, ResultStatus};
pub use types::{DeploymentId, Provider};
