//! Terraport provisioning runner.
//!
//! ```text
//! terraport-runner <TEMPLATE> <DEPLOYMENT_ID> <CREDENTIALS>
//! ```
//!
//! Prints exactly one JSON result line on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use terraport_core::{DeploymentId, ObjectArtifactStore, ProvisioningResult};
use terraport_runner::{RunRequest, Runner, RunnerConfig, RunnerError, TerraformCli};
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Run a provisioning tool against an unpacked template.
#[derive(Debug, Parser)]
#[command(name = "terraport-runner", version)]
struct Args {
    /// Path to the template archive.
    template: PathBuf,

    /// Deployment identifier.
    deployment_id: String,

    /// Path to the credential file.
    credentials: PathBuf,

    /// Configuration file (defaults to `runner.toml`).
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::from_default_env().add_directive(
        "terraport_runner=info"
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    let result = match run(&args).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "runner setup failed");
            e.into_result()
        }
    };

    emit(&result);

    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(args: &Args) -> Result<ProvisioningResult, RunnerError> {
    let config = match &args.config {
        Some(path) => RunnerConfig::from_file(path)?,
        None => RunnerConfig::load()?,
    };

    let deployment_id = DeploymentId::parse(&args.deployment_id).ok_or_else(|| {
        RunnerError::Config(format!("invalid deployment id: {}", args.deployment_id))
    })?;

    let store = ObjectArtifactStore::new(&config.artifacts)
        .map_err(|e| RunnerError::Config(e.to_string()))?;
    let runner = Runner::new(
        Arc::new(store),
        Arc::new(TerraformCli::new(&config.tool)),
        config.workspace_root,
    );

    let request = RunRequest {
        template: args.template.clone(),
        deployment_id,
        credentials: args.credentials.clone(),
    };
    Ok(runner.run(&request).await)
}

/// Write the result as a single JSON line.
fn emit(result: &ProvisioningResult) {
    match serde_json::to_string(result) {
        Ok(line) => println!("{line}"),
        Err(e) => println!(
            "{}",
            serde_json::json!({
                "status": "failed",
                "message": "Runner setup failed.",
                "error": format!("failed to encode result: {e}"),
            })
        ),
    }
}
