//! Configuration for terraport-control.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use terraport_core::StoreConfig;

use crate::error::ControlResult;

/// Top-level configuration for the control service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ControlConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Artifact storage configuration.
    #[serde(default)]
    pub artifacts: StoreConfig,

    /// Remote execution host configuration.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Container invocation configuration.
    #[serde(default)]
    pub container: ContainerConfig,

    /// Deployment behaviour configuration.
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

impl ControlConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `control.toml` in the current directory (if present)
    /// 3. Environment variables with `TERRAPORT_CONTROL_` prefix
    pub fn load() -> ControlResult<Self> {
        Ok(Figment::new()
            .merge(Toml::file("control.toml"))
            .merge(Env::prefixed("TERRAPORT_CONTROL_").split("__"))
            .extract()?)
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ControlResult<Self> {
        Ok(Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TERRAPORT_CONTROL_").split("__"))
            .extract()?)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Largest accepted upload body in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

const fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8000)
}

const fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Remote execution host configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Host name or address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Login user.
    #[serde(default = "default_user")]
    pub user: String,

    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Private key used for both commands and copies.
    pub identity_file: Option<PathBuf>,

    /// Refuse hosts whose key is not already known.
    #[serde(default = "default_strict_host_key_checking")]
    pub strict_host_key_checking: bool,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Parent of per-deployment workspaces. Defaults to the user's home.
    pub workspace_root: Option<String>,
}

fn default_host() -> String {
    "localhost".to_owned()
}

fn default_user() -> String {
    "ec2-user".to_owned()
}

const fn default_port() -> u16 {
    22
}

const fn default_strict_host_key_checking() -> bool {
    true
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

impl RemoteConfig {
    /// Directory under which deployment workspaces are created.
    #[must_use]
    pub fn workspace_root(&self) -> String {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| format!("/home/{}", self.user))
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            user: default_user(),
            port: default_port(),
            identity_file: None,
            strict_host_key_checking: default_strict_host_key_checking(),
            connect_timeout_secs: default_connect_timeout_secs(),
            workspace_root: None,
        }
    }
}

/// Container invocation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerConfig {
    /// Container runtime binary on the remote host.
    #[serde(default = "default_runtime")]
    pub runtime: String,

    /// Image holding the runner and provisioning tool.
    #[serde(default = "default_image")]
    pub image: String,

    /// Runner entry point inside the image.
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,

    /// Path the workspace is mounted at inside the container.
    #[serde(default = "default_mount_path")]
    pub mount_path: String,

    /// Extra environment passed to the container (e.g. artifact store settings).
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Remove the workspace with `sudo`; files created by the container are
    /// owned by root.
    #[serde(default = "default_cleanup_with_sudo")]
    pub cleanup_with_sudo: bool,
}

fn default_runtime() -> String {
    "docker".to_owned()
}

fn default_image() -> String {
    "terraport-runner:latest".to_owned()
}

fn default_entrypoint() -> String {
    "terraport-runner".to_owned()
}

fn default_mount_path() -> String {
    "/app/workspace".to_owned()
}

const fn default_cleanup_with_sudo() -> bool {
    true
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            image: default_image(),
            entrypoint: default_entrypoint(),
            mount_path: default_mount_path(),
            env: BTreeMap::new(),
            cleanup_with_sudo: default_cleanup_with_sudo(),
        }
    }
}

/// Deployment behaviour configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentConfig {
    /// Abandon a remote run after this many seconds. Unbounded when unset.
    pub run_timeout_secs: Option<u64>,

    /// Directory for transient local files. Defaults to the system temp dir.
    pub staging_dir: Option<PathBuf>,
}
