//! Terraport control service.
//!
//! Accepts infrastructure templates with provider credentials, runs the
//! provisioning runner in a container on a remote host and reports the
//! resulting outputs.
//!
//! # Architecture
//!
//! - **Credential registry**: process-lifetime map from deployment to
//!   credential bundle ([`registry`])
//! - **Artifact store**: templates, logs and outputs in an object store
//!   (from `terraport-core`)
//! - **Remote execution**: `ssh`/`scp` gateway behind the
//!   [`CommandRunner`] and [`FileTransport`] traits ([`remote`])
//! - **Orchestrator**: the submit / deploy / status lifecycle
//!   ([`orchestrator`])
//! - **API surface**: HTTP endpoints for upload, deploy and status ([`api`])
//!
//! # Run lifecycle
//!
//! ```text
//! Submitted ──▶ Staged ──▶ Transferred ──▶ Running ──▶ Completed ──▶ Cleaned
//! ```
//!
//! Remote workspace cleanup is attempted after every completed run, whatever
//! its outcome, and after a timed-out run.
//!
//! # Known limitations
//!
//! The registry is not persisted: a restart between upload and deploy loses
//! the credentials and the deploy fails with `CredentialsMissing`. A running
//! remote provisioning run cannot be cancelled, only abandoned on timeout.

#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod registry;
pub mod remote;
pub mod service;

// Re-export commonly used types at the crate root
pub use config::ControlConfig;
pub use error::{ControlError, ControlResult, ErrorKind};
pub use lifecycle::{Cleaned, Completed, Run, RunState, Running, Staged, Submitted, Transferred};
pub use orchestrator::{Orchestrator, StatusReport};
pub use registry::{CredentialRegistry, MemoryRegistry};
pub use remote::{
    CommandOutput, CommandRunner, ContainerCommand, FileTransport, RemoteWorkspace, SshGateway,
};
pub use service::ControlService;
