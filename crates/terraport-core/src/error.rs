//! Error types for terraport-core.

use thiserror::Error;

/// Result type alias using [`ArtifactError`].
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Errors raised by the artifact store gateway.
///
/// A missing object is not an error: [`crate::ArtifactStore::get`] reports it
/// as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The backing store could not be reached or refused the operation.
    #[error("artifact store unavailable for {key}: {message}")]
    Unavailable {
        /// Object key involved in the failed operation.
        key: String,
        /// Underlying store diagnostic.
        message: String,
    },

    /// The store could not be constructed from its configuration.
    #[error("artifact store configuration error: {0}")]
    Config(String),
}

impl ArtifactError {
    /// Create an unavailable error for a key.
    #[must_use]
    pub fn unavailable(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Unavailable {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Errors raised while building or parsing a credential bundle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The provider tag is not one of the known variants.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// A field required by the provider variant is absent or empty.
    #[error("missing credential field '{field}' for provider {provider}")]
    MissingField {
        /// Provider tag.
        provider: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The serialised bundle could not be decoded.
    #[error("malformed credentials: {0}")]
    Malformed(String),
}
