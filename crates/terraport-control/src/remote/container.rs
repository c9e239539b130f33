//! Container command builder.
//!
//! Builds the single shell command that runs the provisioning runner in a
//! container on the execution host.

use std::collections::BTreeMap;

use terraport_core::{DeploymentId, StoreConfig, StoreType};

use super::{shell_quote, RemoteWorkspace, CREDENTIALS_FILE, TEMPLATE_FILE};
use crate::config::ContainerConfig;

/// Builder for constructing container run commands.
#[derive(Debug, Clone)]
pub struct ContainerCommand {
    /// Runtime binary.
    runtime: String,
    /// Image to run.
    image: String,
    /// Command run inside the container.
    entrypoint: Option<String>,
    /// Bind mounts (host path, container path).
    mounts: Vec<(String, String)>,
    /// Environment variables.
    env: BTreeMap<String, String>,
    /// Arguments passed to the entry point.
    args: Vec<String>,
}

impl ContainerCommand {
    /// Create a builder for `runtime run image`.
    #[must_use]
    pub fn new(runtime: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            image: image.into(),
            entrypoint: None,
            mounts: Vec::new(),
            env: BTreeMap::new(),
            args: Vec::new(),
        }
    }

    /// The runner invocation for one deployment.
    ///
    /// The workspace is mounted at the configured path and the runner
    /// receives the template path, deployment ID and credential path. The
    /// runner publishes to the same artifact store as `artifacts`; entries in
    /// `config.env` take precedence over the forwarded store settings.
    #[must_use]
    pub fn runner(
        config: &ContainerConfig,
        artifacts: &StoreConfig,
        workspace: &RemoteWorkspace,
        id: &DeploymentId,
    ) -> Self {
        let mount = config.mount_path.trim_end_matches('/');
        let mut cmd = Self::new(&config.runtime, &config.image)
            .entrypoint(&config.entrypoint)
            .bind(workspace.dir(), mount)
            .arg(format!("{mount}/{TEMPLATE_FILE}"))
            .arg(id.as_str())
            .arg(format!("{mount}/{CREDENTIALS_FILE}"));
        for (key, value) in store_env(artifacts) {
            cmd = cmd.env(key, value);
        }
        for (key, value) in &config.env {
            cmd = cmd.env(key, value);
        }
        cmd
    }

    /// Set the command run inside the container.
    #[must_use]
    pub fn entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    /// Add a bind mount.
    #[must_use]
    pub fn bind(mut self, src: impl Into<String>, dest: impl Into<String>) -> Self {
        self.mounts.push((src.into(), dest.into()));
        self
    }

    /// Set an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }


    /// Build the argument vector.
    #[must_use]
    pub fn build(&self) -> Vec<String> {
        let mut argv = vec![self.runtime.clone(), "run".to_owned(), "--rm".to_owned()];

        for (src, dest) in &self.mounts {
            argv.push("-v".to_owned());
            argv.push(format!("{src}:{dest}"));
        }

        for (key, value) in &self.env {
            argv.push("-e".to_owned());
            argv.push(format!("{key}={value}"));
        }

        argv.push(self.image.clone());

        if let Some(entrypoint) = &self.entrypoint {
            argv.push(entrypoint.clone());
        }
        argv.extend(self.args.iter().cloned());

        argv
    }

    /// Render as a single shell command line.
    #[must_use]
    pub fn to_shell(&self) -> String {
        self.build()
            .iter()
            .map(|word| shell_quote(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runner environment pointing it at the given artifact store.
///
/// Static keys are not forwarded; the runner picks up store credentials
/// from its own environment or instance role.
fn store_env(artifacts: &StoreConfig) -> Vec<(&'static str, String)> {
    let mut env = vec![(
        "TERRAPORT_RUNNER_ARTIFACTS__STORAGE_TYPE",
        artifacts.storage_type.as_str().to_owned(),
    )];
    if artifacts.storage_type != StoreType::Memory {
        env.push(("TERRAPORT_RUNNER_ARTIFACTS__PATH", artifacts.path.clone()));
    }
    if let Some(region) = &artifacts.region {
        env.push(("TERRAPORT_RUNNER_ARTIFACTS__REGION", region.clone()));
    }
    if let Some(endpoint) = &artifacts.endpoint {
        env.push(("TERRAPORT_RUNNER_ARTIFACTS__ENDPOINT", endpoint.clone()));
    }
    env
}
