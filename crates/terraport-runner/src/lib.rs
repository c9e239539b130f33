//! Provisioning runner for terraport deployments.
//!
//! The runner executes once per deploy inside a container on the remote
//! host. It unpacks the template, maps the credential bundle onto the
//! environment variables the provisioning tool expects, drives the
//! `init → plan → apply → output` sequence and publishes logs and outputs to
//! the artifact store.
//!
//! Whatever happens, the binary prints exactly one [`ProvisioningResult`]
//! JSON object on stdout. Diagnostics go to stderr.
//!
//! [`ProvisioningResult`]: terraport_core::ProvisioningResult

#![forbid(unsafe_code)]

pub mod ansi;
pub mod archive;
pub mod config;
pub mod environment;
pub mod error;
pub mod runner;
pub mod tool;

pub use config::{RunnerConfig, ToolConfig};
pub use environment::ProviderEnv;
pub use error::{RunnerError, RunnerResult};
pub use runner::{RunRequest, Runner};
pub use tool::{Stage, StageExecutor, StageOutput, TerraformCli};
