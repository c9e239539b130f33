//! Deployment orchestrator.
//!
//! Drives a deployment from submission through a remote containerised
//! provisioning run to a status report:
//!
//! 1. `submit` validates credentials, stores the template and registers the
//!    bundle under a fresh identifier
//! 2. `deploy` stages both inputs locally, copies them into a remote
//!    workspace, runs the provisioning runner in a container, removes the
//!    workspace and parses the runner's result line
//! 3. `status` reads the published outputs, if any
//!
//! Only one `deploy` may be in flight per deployment; a second one fails
//! with [`ControlError::DeploymentInProgress`].

mod locks;
mod status;

pub use locks::{DeploymentGuard, DeploymentLocks};
pub use status::StatusReport;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;
use terraport_core::{
    render_summary, ArtifactKey, ArtifactStore, CredentialBundle, CredentialFields, DeploymentId,
    Outputs, ProvisioningResult, StoreConfig,
};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ContainerConfig, ControlConfig};
use crate::error::{ControlError, ControlResult};
use crate::lifecycle::{Completed, Run, Staged};
use crate::registry::CredentialRegistry;
use crate::remote::{
    CommandOutput, CommandRunner, ContainerCommand, FileTransport, RemoteWorkspace,
    CREDENTIALS_FILE, TEMPLATE_FILE,
};

/// Coordinates the registry, artifact store and remote host.
pub struct Orchestrator {
    registry: Arc<dyn CredentialRegistry>,
    artifacts: Arc<dyn ArtifactStore>,
    commands: Arc<dyn CommandRunner>,
    transport: Arc<dyn FileTransport>,
    container: ContainerConfig,
    store: StoreConfig,
    workspace_root: String,
    cleanup_with_sudo: bool,
    run_timeout: Option<Duration>,
    staging_dir: Option<PathBuf>,
    locks: DeploymentLocks,
}

impl Orchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        registry: Arc<dyn CredentialRegistry>,
        artifacts: Arc<dyn ArtifactStore>,
        commands: Arc<dyn CommandRunner>,
        transport: Arc<dyn FileTransport>,
        config: &ControlConfig,
    ) -> Self {
        Self {
            registry,
            artifacts,
            commands,
            transport,
            container: config.container.clone(),
            store: config.artifacts.clone(),
            workspace_root: config.remote.workspace_root(),
            cleanup_with_sudo: config.container.cleanup_with_sudo,
            run_timeout: config.deployment.run_timeout_secs.map(Duration::from_secs),
            staging_dir: config.deployment.staging_dir.clone(),
            locks: DeploymentLocks::new(),
        }
    }

    /// Accept a template and credentials for a new deployment.
    ///
    /// Credentials are validated before anything is stored, so a rejected
    /// submission leaves no artifacts behind.
    #[instrument(skip(self, template, credentials), fields(size = template.len()))]
    pub async fn submit(
        &self,
        template: Bytes,
        provider: &str,
        credentials: CredentialFields,
    ) -> ControlResult<DeploymentId> {
        let bundle = CredentialBundle::from_fields(provider, credentials)?;
        let id = DeploymentId::generate();

        self.artifacts
            .put(&ArtifactKey::template(&id), template)
            .await?;
        self.registry.put(&id, bundle).await;

        info!(deployment_id = %id, "deployment submitted");
        Ok(id)
    }

    /// Run the provisioning runner remotely for a submitted deployment.
    ///
    /// Blocks until the remote run finishes. A failed provisioning run is
    /// returned as a failed [`ProvisioningResult`]; errors are reserved for
    /// runs that could not be carried out or whose result is unreadable.
    #[instrument(skip(self))]
    pub async fn deploy(&self, id: &str) -> ControlResult<ProvisioningResult> {
        let id = parse_id(id)?;
        let _guard = self.locks.try_acquire(&id)?;

        let template = self
            .artifacts
            .get(&ArtifactKey::template(&id))
            .await?
            .ok_or_else(|| ControlError::TemplateMissing(id.to_string()))?;
        let bundle = self
            .registry
            .get(&id)
            .await
            .ok_or_else(|| ControlError::CredentialsMissing(id.to_string()))?;

        let run = Run::new(id.clone(), RemoteWorkspace::new(&self.workspace_root, &id));

        let staging = self.stage(&template, &bundle).await?;
        let run = run.staged();

        let transfer = self.transfer(&run, staging.path()).await;
        if let Err(e) = staging.close() {
            warn!(deployment_id = %id, error = %e, "failed to remove staging directory");
        }
        transfer?;
        let run = run.transferred().start();

        let command =
            ContainerCommand::runner(&self.container, &self.store, run.workspace(), &id).to_shell();
        info!(deployment_id = %id, workspace = run.workspace().dir(), "starting remote run");
        let outcome = self.execute(&command).await;

        let run = run.complete(outcome.as_ref().ok().and_then(|o| o.exit_code));
        debug!(
            deployment_id = %id,
            state = run.state_name(),
            exit_code = ?run.exit_code(),
            "remote run returned"
        );
        self.cleanup(&run).await;
        let run = run.cleaned();

        let output = outcome?;
        let result = parse_result(output)?;

        info!(
            deployment_id = %id,
            status = ?result.status,
            elapsed_ms = run.elapsed().num_milliseconds(),
            "deployment finished"
        );
        Ok(result)
    }

    /// Report the published outputs for a deployment.
    ///
    /// A pure read of the outputs artifact; safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn status(&self, id: &str) -> ControlResult<StatusReport> {
        let id = parse_id(id)?;

        let Some(data) = self.artifacts.get(&ArtifactKey::outputs(&id)).await? else {
            debug!(deployment_id = %id, "no outputs published");
            return Ok(StatusReport::PendingOrFailed);
        };

        let outputs: Outputs = serde_json::from_slice(&data).map_err(|e| {
            ControlError::internal(format!("stored outputs for {id} are unreadable: {e}"))
        })?;

        Ok(StatusReport::Success {
            summary: render_summary(&outputs),
            outputs,
        })
    }

    /// Returns true if a deploy is in flight for the deployment.
    #[must_use]
    pub fn is_running(&self, id: &DeploymentId) -> bool {
        self.locks.is_held(id)
    }

    /// Write the template and credential file to a fresh local directory.
    async fn stage(&self, template: &Bytes, bundle: &CredentialBundle) -> ControlResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("terraport-");
        let dir = match &self.staging_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(ControlError::staging)?;

        let credentials = bundle
            .to_json()
            .map_err(|e| ControlError::internal(format!("failed to encode credentials: {e}")))?;

        tokio::fs::write(dir.path().join(TEMPLATE_FILE), template)
            .await
            .map_err(ControlError::staging)?;
        tokio::fs::write(dir.path().join(CREDENTIALS_FILE), credentials)
            .await
            .map_err(ControlError::staging)?;

        Ok(dir)
    }

    /// Create the remote workspace and copy both inputs into it.
    async fn transfer(&self, run: &Run<Staged>, staging: &Path) -> ControlResult<()> {
        let workspace = run.workspace();

        self.commands
            .run(&workspace.create_command())
            .await?
            .check("workspace creation")?;

        self.transport
            .copy_to(&staging.join(TEMPLATE_FILE), &workspace.template_path())
            .await?;
        self.transport
            .copy_to(&staging.join(CREDENTIALS_FILE), &workspace.credentials_path())
            .await?;

        debug!(deployment_id = %run.id(), "inputs transferred");
        Ok(())
    }

    async fn execute(&self, command: &str) -> ControlResult<CommandOutput> {
        match self.run_timeout {
            Some(limit) => tokio::time::timeout(limit, self.commands.run(command))
                .await
                .map_err(|_| ControlError::Timeout { limit })?,
            None => self.commands.run(command).await,
        }
    }

    /// Remove the remote workspace. Failures are logged and otherwise ignored.
    async fn cleanup(&self, run: &Run<Completed>) {
        let id = run.id();
        let command = run.workspace().remove_command(self.cleanup_with_sudo);

        match self.commands.run(&command).await {
            Ok(output) if output.success() => {
                debug!(deployment_id = %id, "remote workspace removed");
            }
            Ok(output) => {
                warn!(
                    deployment_id = %id,
                    exit_code = ?output.exit_code,
                    stderr = %output.stderr.trim_end(),
                    "failed to remove remote workspace"
                );
            }
            Err(e) => {
                warn!(deployment_id = %id, error = %e, "failed to remove remote workspace");
            }
        }
    }
}

fn parse_id(id: &str) -> ControlResult<DeploymentId> {
    DeploymentId::parse(id).ok_or_else(|| ControlError::InvalidDeploymentId(id.to_owned()))
}

/// Exit codes that come from ssh (255) or the container runtime (125-127)
/// rather than from the runner.
const TRANSPORT_EXIT_CODES: [i32; 4] = [125, 126, 127, 255];

/// Parse the runner's result from the last non-empty stdout line.
///
/// Without a result line, a transport exit code means the runner never ran
/// and is reported as a remote execution failure.
fn parse_result(output: CommandOutput) -> ControlResult<ProvisioningResult> {
    let parsed = output
        .stdout
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .map(serde_json::from_str::<ProvisioningResult>);

    let reason = match parsed {
        Some(Ok(result)) => return Ok(result),
        Some(Err(e)) => e.to_string(),
        None => "runner produced no output".to_owned(),
    };

    if output
        .exit_code
        .is_some_and(|code| TRANSPORT_EXIT_CODES.contains(&code))
    {
        error!(
            exit_code = ?output.exit_code,
            stderr = %output.stderr.trim_end(),
            "container run failed before the runner reported"
        );
        return Err(ControlError::remote(
            "container run",
            output.exit_code,
            output.stderr,
        ));
    }

    error!(
        exit_code = ?output.exit_code,
        reason = %reason,
        "runner result could not be parsed"
    );
    Err(ControlError::ResultUnparseable {
        reason,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use terraport_core::ResultStatus;

    fn output(exit_code: i32, stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            exit_code: Some(exit_code),
            stdout: stdout.to_owned(),
            stderr: stderr.to_owned(),
        }
    }

    #[test]
    fn parses_last_line() {
        let stdout = "Unable to find image locally\n\
                      {\"status\":\"failed\",\"message\":\"Unsupported provider\",\"error\":\"unsupported provider: gcp\"}\n";
        let result = parse_result(output(1, stdout, "")).unwrap();

        assert_eq!(result.status, ResultStatus::Failed);
        assert_eq!(result.message, "Unsupported provider");
    }

    #[test]
    fn empty_output_is_unparseable() {
        let err = parse_result(output(137, "", "Killed")).unwrap_err();
        match err {
            ControlError::ResultUnparseable {
                reason,
                exit_code,
                stderr,
                ..
            } => {
                assert_eq!(reason, "runner produced no output");
                assert_eq!(exit_code, Some(137));
                assert_eq!(stderr, "Killed");
            }
            other => panic!("expected unparseable result, got {other:?}"),
        }
    }

    #[test]
    fn transport_exit_codes_are_remote_failures() {
        for code in [125, 126, 127, 255] {
            let err = parse_result(output(code, "", "ssh: connect to host: Connection refused"))
                .unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Transport, "exit {code}");
            assert!(matches!(
                err,
                ControlError::RemoteExecution { exit_code: Some(c), ref stderr, .. }
                    if c == code && stderr.contains("Connection refused")
            ));
        }
    }

    #[test]
    fn result_line_wins_over_transport_exit_code() {
        let stdout = "{\"status\":\"failed\",\"message\":\"Runner setup failed.\",\"error\":\"boom\"}\n";
        let result = parse_result(output(127, stdout, "")).unwrap();
        assert_eq!(result.status, ResultStatus::Failed);
    }

    #[test]
    fn partial_output_is_unparseable() {
        let err = parse_result(output(0, "{\"status\":\"succ", "")).unwrap_err();
        assert!(matches!(
            err,
            ControlError::ResultUnparseable { ref stdout, .. } if stdout == "{\"status\":\"succ"
        ));
    }

    #[test]
    fn invalid_ids_are_rejected() {
        assert!(matches!(
            parse_id("../../etc"),
            Err(ControlError::InvalidDeploymentId(_))
        ));
        assert!(parse_id("01hq3k9v6m").is_ok());
    }
}
