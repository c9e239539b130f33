//! Configuration for terraport-runner.

use std::path::PathBuf;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use terraport_core::StoreConfig;

use crate::error::RunnerResult;

/// Top-level configuration for the runner.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Artifact storage configuration.
    #[serde(default)]
    pub artifacts: StoreConfig,

    /// Provisioning tool configuration.
    #[serde(default)]
    pub tool: ToolConfig,

    /// Directory the remote workspace is mounted at.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("/app/workspace")
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            artifacts: StoreConfig::default(),
            tool: ToolConfig::default(),
            workspace_root: default_workspace_root(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `runner.toml` in the current directory (if present)
    /// 3. Environment variables with `TERRAPORT_RUNNER_` prefix
    pub fn load() -> RunnerResult<Self> {
        Ok(Figment::new()
            .merge(Toml::file("runner.toml"))
            .merge(Env::prefixed("TERRAPORT_RUNNER_").split("__"))
            .extract()?)
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> RunnerResult<Self> {
        Ok(Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TERRAPORT_RUNNER_").split("__"))
            .extract()?)
    }
}

/// Provisioning tool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    /// Tool binary, resolved through `PATH` if not absolute.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Plan file written by the plan stage and consumed by apply.
    #[serde(default = "default_plan_file")]
    pub plan_file: String,
}

fn default_binary() -> PathBuf {
    PathBuf::from("terraform")
}

fn default_plan_file() -> String {
    "tfplan".to_owned()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            plan_file: default_plan_file(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use terraport_core::StoreType;

    #[test]
    fn default_config_is_valid() {
        let config = RunnerConfig::default();
        assert_eq!(config.workspace_root, PathBuf::from("/app/workspace"));
        assert_eq!(config.tool.binary, PathBuf::from("terraform"));
        assert_eq!(config.tool.plan_file, "tfplan");
    }

    #[test]
    fn config_from_toml() {
        let toml = r#"
            workspace_root = "/mnt/work"

            [artifacts]
            storage_type = "s3"
            path = "deployments"
            region = "eu-west-1"

            [tool]
            binary = "/usr/local/bin/terraform"
        "#;

        let config: RunnerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.workspace_root, PathBuf::from("/mnt/work"));
        assert_eq!(config.artifacts.storage_type, StoreType::S3);
        assert_eq!(config.artifacts.path, "deployments");
        assert_eq!(config.artifacts.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.tool.binary, PathBuf::from("/usr/local/bin/terraform"));
        assert_eq!(config.tool.plan_file, "tfplan");
    }
}
