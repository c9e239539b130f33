//! Provider environment variables for the provisioning tool.

use std::fmt;

use terraport_core::{CredentialBundle, SecretField};

/// Environment variables derived from a credential bundle.
///
/// Values are applied to the tool's child process only and never to the
/// runner's own environment.
#[derive(Clone)]
pub struct ProviderEnv {
    vars: Vec<(&'static str, SecretField)>,
}

impl ProviderEnv {
    /// Map a bundle onto the variable names the provisioning tool reads.
    #[must_use]
    pub fn from_bundle(bundle: &CredentialBundle) -> Self {
        let vars = match bundle {
            CredentialBundle::Aws {
                access_key_id,
                secret_access_key,
            } => vec![
                ("AWS_ACCESS_KEY_ID", access_key_id.clone()),
                ("AWS_SECRET_ACCESS_KEY", secret_access_key.clone()),
            ],
            CredentialBundle::Azure {
                client_id,
                client_secret,
                tenant_id,
                subscription_id,
            } => vec![
                ("ARM_CLIENT_ID", client_id.clone()),
                ("ARM_CLIENT_SECRET", client_secret.clone()),
                ("ARM_TENANT_ID", tenant_id.clone()),
                ("ARM_SUBSCRIPTION_ID", subscription_id.clone()),
            ],
        };
        Self { vars }
    }

    /// An empty environment.
    #[must_use]
    pub const fn empty() -> Self {
        Self { vars: Vec::new() }
    }

    /// Variable names, in the order they are applied.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.vars.iter().map(|(name, _)| *name)
    }

    /// Look up a variable's value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| value.expose())
    }

    /// Apply the variables to a child process.
    pub fn apply(&self, cmd: &mut tokio::process::Command) {
        for (name, value) in &self.vars {
            cmd.env(name, value.expose());
        }
    }
}

impl fmt::Debug for ProviderEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
