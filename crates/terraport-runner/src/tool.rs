//! Provisioning tool stages.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::config::ToolConfig;
use crate::environment::ProviderEnv;
use crate::error::{RunnerError, RunnerResult};

/// One step of the provisioning sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Initialise the working directory and download providers.
    Init,
    /// Compute the change set and write it to the plan file.
    Plan,
    /// Apply the saved plan.
    Apply,
    /// Report outputs as JSON.
    Output,
}

impl Stage {
    /// All stages, in execution order.
    pub const SEQUENCE: [Self; 4] = [Self::Init, Self::Plan, Self::Apply, Self::Output];

    /// Command-line arguments for this stage.
    #[must_use]
    pub fn args(&self, plan_file: &str) -> Vec<String> {
        match self {
            Self::Init => vec!["init".to_owned(), "-input=false".to_owned()],
            Self::Plan => vec![
                "plan".to_owned(),
                "-input=false".to_owned(),
                format!("-out={plan_file}"),
            ],
            Self::Apply => vec![
                "apply".to_owned(),
                "-input=false".to_owned(),
                plan_file.to_owned(),
            ],
            Self::Output => vec!["output".to_owned(), "-json".to_owned()],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Plan => write!(f, "plan"),
            Self::Apply => write!(f, "apply"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Captured result of one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    /// Process exit code, `-1` if terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl StageOutput {
    /// A successful stage with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed stage with the given stderr.
    #[must_use]
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the stage exited zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Diagnostic text for a failed stage.
    ///
    /// Standard error is preferred; standard output is used when the tool
    /// wrote nothing to stderr.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        text.trim_end().to_owned()
    }
}

/// Executes provisioning tool stages.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Run one stage in `workdir` with the provider environment applied.
    ///
    /// A non-zero exit is reported in [`StageOutput`], not as an error.
    /// Errors are reserved for failures to run the tool at all.
    async fn execute(
        &self,
        stage: Stage,
        workdir: &Path,
        env: &ProviderEnv,
    ) -> RunnerResult<StageOutput>;
}

/// Runs the terraform CLI as a child process.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: PathBuf,
    plan_file: String,
}

impl TerraformCli {
    /// Create an executor from tool configuration.
    #[must_use]
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            plan_file: config.plan_file.clone(),
        }
    }

    fn command(&self, stage: Stage, workdir: &Path, env: &ProviderEnv) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(stage.args(&self.plan_file))
            .current_dir(workdir)
            .env("TF_IN_AUTOMATION", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        env.apply(&mut cmd);
        cmd
    }
}

#[async_trait]
impl StageExecutor for TerraformCli {
    #[instrument(skip(self, workdir, env), fields(workdir = %workdir.display()))]
    async fn execute(
        &self,
        stage: Stage,
        workdir: &Path,
        env: &ProviderEnv,
    ) -> RunnerResult<StageOutput> {
        let output = self
            .command(stage, workdir, env)
            .output()
            .await
            .map_err(|e| RunnerError::Spawn {
                stage,
                message: format!("{}: {e}", self.binary.display()),
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code, "stage finished");

        Ok(StageOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Stage::Init, &["init", "-input=false"])]
    #[case(Stage::Plan, &["plan", "-input=false", "-out=tfplan"])]
    #[case(Stage::Apply, &["apply", "-input=false", "tfplan"])]
    #[case(Stage::Output, &["output", "-json"])]
    fn stage_arguments(#[case] stage: Stage, #[case] expected: &[&str]) {
        assert_eq!(stage.args("tfplan"), expected);
    }

    #[test]
    fn diagnostic_prefers_stderr() {
        let output = StageOutput {
            exit_code: 1,
            stdout: "plan output".to_owned(),
            stderr: "quota exceeded\n".to_owned(),
        };
        assert_eq!(output.diagnostic(), "quota exceeded");

        let output = StageOutput {
            exit_code: 1,
            stdout: "Error: no configuration files\n".to_owned(),
            stderr: String::new(),
        };
        assert_eq!(output.diagnostic(), "Error: no configuration files");
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = TerraformCli::new(&ToolConfig {
            binary: PathBuf::from("/nonexistent/terraform"),
            plan_file: "tfplan".to_owned(),
        });

        let err = cli
            .execute(Stage::Init, dir.path(), &ProviderEnv::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { stage: Stage::Init, .. }));
    }
}
