//! Provider credential bundles.
//!
//! A [`CredentialBundle`] is a tagged union keyed by provider. Field values
//! are held in [`SecretField`]s so they are never printed by `Debug` and are
//! zeroed when dropped.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CredentialError;
use crate::types::Provider;

/// A single secret credential value.
#[derive(Clone)]
pub struct SecretField(SecretString);

impl SecretField {
    /// Wrap a value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Expose the secret value for use.
    ///
    /// The returned reference must not be logged or stored.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Returns true if the value is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl fmt::Debug for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Serialize for SecretField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for SecretField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Credentials for exactly one provider.
///
/// The serialised form is the credential file handed to the runner:
///
/// ```json
/// {"provider": "aws", "access_key_id": "...", "secret_access_key": "..."}
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum CredentialBundle {
    /// Amazon Web Services access key pair.
    Aws {
        /// Access key identifier.
        access_key_id: SecretField,
        /// Secret access key.
        secret_access_key: SecretField,
    },
    /// Azure service principal.
    Azure {
        /// Application (client) identifier.
        client_id: SecretField,
        /// Client secret.
        client_secret: SecretField,
        /// Directory (tenant) identifier.
        tenant_id: SecretField,
        /// Subscription identifier.
        subscription_id: SecretField,
    },
}

impl CredentialBundle {
    /// Build a bundle from a provider tag and loose form fields.
    ///
    /// The provider tag is checked first, so an unknown provider is reported
    /// even when no fields were supplied.
    pub fn from_fields(provider: &str, fields: CredentialFields) -> Result<Self, CredentialError> {
        let provider: Provider = provider.parse()?;
        let tag = provider.as_str();
        let bundle = match provider {
            Provider::Aws => Self::Aws {
                access_key_id: require(tag, "access_key_id", fields.access_key_id)?,
                secret_access_key: require(tag, "secret_access_key", fields.secret_access_key)?,
            },
            Provider::Azure => Self::Azure {
                client_id: require(tag, "client_id", fields.client_id)?,
                client_secret: require(tag, "client_secret", fields.client_secret)?,
                tenant_id: require(tag, "tenant_id", fields.tenant_id)?,
                subscription_id: require(tag, "subscription_id", fields.subscription_id)?,
            },
        };
        Ok(bundle)
    }

    /// Decode a serialised credential file.
    ///
    /// An unknown provider tag yields [`CredentialError::UnsupportedProvider`]
    /// rather than a generic decoding failure.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CredentialError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| CredentialError::Malformed(e.to_string()))?;

        let tag = value
            .get("provider")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| CredentialError::Malformed("missing provider tag".to_owned()))?;
        tag.parse::<Provider>()?;

        let bundle: Self = serde_json::from_value(value)
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Serialise the bundle into the credential file format.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// The provider this bundle targets.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        match self {
            Self::Aws { .. } => Provider::Aws,
            Self::Azure { .. } => Provider::Azure,
        }
    }

    fn validate(&self) -> Result<(), CredentialError> {
        let tag = self.provider().as_str();
        let fields: Vec<(&'static str, &SecretField)> = match self {
            Self::Aws {
                access_key_id,
                secret_access_key,
            } => vec![
                ("access_key_id", access_key_id),
                ("secret_access_key", secret_access_key),
            ],
            Self::Azure {
                client_id,
                client_secret,
                tenant_id,
                subscription_id,
            } => vec![
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("tenant_id", tenant_id),
                ("subscription_id", subscription_id),
            ],
        };

        match fields.into_iter().find(|(_, value)| value.is_blank()) {
            Some((field, _)) => Err(CredentialError::MissingField {
                provider: tag,
                field,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("provider", &self.provider())
            .finish_non_exhaustive()
    }
}

fn require(
    provider: &'static str,
    field: &'static str,
    value: Option<String>,
) -> Result<SecretField, CredentialError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(SecretField::new(v)),
        _ => Err(CredentialError::MissingField { provider, field }),
    }
}

/// Loose, provider-agnostic credential fields as submitted by a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialFields {
    /// AWS access key identifier.
    pub access_key_id: Option<String>,
    /// AWS secret access key.
    pub secret_access_key: Option<String>,
    /// Azure client identifier.
    pub client_id: Option<String>,
    /// Azure client secret.
    pub client_secret: Option<String>,
    /// Azure tenant identifier.
    pub tenant_id: Option<String>,
    /// Azure subscription identifier.
    pub subscription_id: Option<String>,
}

impl CredentialFields {
    /// Fields for an AWS key pair.
    #[must_use]
    pub fn aws(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: Some(access_key_id.into()),
            secret_access_key: Some(secret_access_key.into()),
            ..Self::default()
        }
    }

    /// Fields for an Azure service principal.
    #[must_use]
    pub fn azure(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            tenant_id: Some(tenant_id.into()),
            subscription_id: Some(subscription_id.into()),
            ..Self::default()
        }
    }
}
