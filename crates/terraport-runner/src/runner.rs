//! The provisioning pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use terraport_core::{
    ArtifactKey, ArtifactStore, CredentialBundle, DeploymentId, Outputs, ProvisioningResult,
};
use tracing::{error, info, instrument, warn};

use crate::ansi::strip_control_sequences;
use crate::archive;
use crate::environment::ProviderEnv;
use crate::error::{RunnerError, RunnerResult};
use crate::tool::{Stage, StageExecutor, StageOutput};

/// Inputs for one run, as passed on the command line.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Path to the template archive.
    pub template: PathBuf,
    /// Deployment being provisioned.
    pub deployment_id: DeploymentId,
    /// Path to the serialised credential bundle.
    pub credentials: PathBuf,
}

/// Drives one provisioning run.
pub struct Runner {
    store: Arc<dyn ArtifactStore>,
    executor: Arc<dyn StageExecutor>,
    workspace_root: PathBuf,
}

impl Runner {
    /// Create a runner.
    ///
    /// Templates are unpacked to `{workspace_root}/{deployment_id}`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        executor: Arc<dyn StageExecutor>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            executor,
            workspace_root: workspace_root.into(),
        }
    }

    /// Run the full pipeline.
    ///
    /// Never fails: every error is folded into a failed result.
    #[instrument(skip(self, request), fields(deployment_id = %request.deployment_id))]
    pub async fn run(&self, request: &RunRequest) -> ProvisioningResult {
        match self.try_run(request).await {
            Ok(result) => {
                info!(warnings = result.warnings.len(), "provisioning succeeded");
                result
            }
            Err(e) => {
                error!(error = %e, "provisioning failed");
                e.into_result()
            }
        }
    }

    async fn try_run(&self, request: &RunRequest) -> RunnerResult<ProvisioningResult> {
        let id = &request.deployment_id;
        let workdir = self.workspace_root.join(id.as_str());

        archive::unpack(&request.template, &workdir).await?;

        let bundle = read_credentials(&request.credentials).await?;
        info!(provider = %bundle.provider(), "credentials loaded");
        let env = ProviderEnv::from_bundle(&bundle);

        let mut apply_output = StageOutput::default();
        let mut outputs_json = String::new();

        for stage in Stage::SEQUENCE {
            let output = self.run_stage(id, stage, &workdir, &env).await?;
            match stage {
                Stage::Apply => apply_output = output,
                Stage::Output => outputs_json = output.stdout,
                Stage::Init | Stage::Plan => {}
            }
        }

        let outputs: Outputs = match serde_json::from_str(&outputs_json) {
            Ok(outputs) => outputs,
            Err(e) => {
                let err = RunnerError::OutputsUnparseable(e.to_string());
                self.publish_error_log(id, format!("{err}\n{}", outputs_json.trim_end()))
                    .await;
                return Err(err);
            }
        };

        let warnings = self.publish(id, &apply_output, &outputs).await;
        Ok(ProvisioningResult::success(outputs).with_warnings(warnings))
    }

    async fn run_stage(
        &self,
        id: &DeploymentId,
        stage: Stage,
        workdir: &Path,
        env: &ProviderEnv,
    ) -> RunnerResult<StageOutput> {
        info!(%stage, "running stage");
        let output = self.executor.execute(stage, workdir, env).await?;

        if output.success() {
            return Ok(output);
        }

        let diagnostic = output.diagnostic();
        warn!(%stage, exit_code = output.exit_code, "stage failed");
        self.publish_error_log(id, diagnostic.clone()).await;

        Err(RunnerError::StageFailed {
            stage,
            exit_code: output.exit_code,
            diagnostic,
        })
    }

    async fn publish_error_log(&self, id: &DeploymentId, diagnostic: String) {
        let key = ArtifactKey::error_log(id);
        if let Err(e) = self.store.put(&key, Bytes::from(diagnostic.into_bytes())).await {
            error!(key = %key, error = %e, "failed to publish error log");
        }
    }

    /// Publish the apply log and outputs. Failures become warnings.
    async fn publish(
        &self,
        id: &DeploymentId,
        apply_output: &StageOutput,
        outputs: &Outputs,
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        let log = strip_control_sequences(&apply_output.stdout).into_owned();
        let key = ArtifactKey::log(id);
        if let Err(e) = self.store.put(&key, Bytes::from(log.into_bytes())).await {
            warn!(key = %key, error = %e, "failed to publish log");
            warnings.push(format!("failed to publish log: {e}"));
        }

        let key = ArtifactKey::outputs(id);
        match serde_json::to_vec(outputs) {
            Ok(data) => {
                if let Err(e) = self.store.put(&key, Bytes::from(data)).await {
                    warn!(key = %key, error = %e, "failed to publish outputs");
                    warnings.push(format!("failed to publish outputs: {e}"));
                }
            }
            Err(e) => warnings.push(format!("failed to encode outputs: {e}")),
        }

        warnings
    }
}

async fn read_credentials(path: &Path) -> RunnerResult<CredentialBundle> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| RunnerError::CredentialsRead {
            path: path.to_owned(),
            source,
        })?;
    Ok(CredentialBundle::from_json(&raw)?)
}
