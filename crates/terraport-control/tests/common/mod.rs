//! Shared harness for control integration tests.
//!
//! [`FakeRemote`] stands in for the execution host: remote paths map into a
//! temporary directory and the container command runs the provisioning
//! runner in-process against the same artifact store the orchestrator uses.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use tempfile::TempDir;
use terraport_control::api::{router, AppState};
use terraport_control::{
    CommandOutput, CommandRunner, ControlConfig, ControlError, ControlResult, FileTransport,
    MemoryRegistry, Orchestrator,
};
use terraport_core::{
    ArtifactKey, ArtifactStore, DeploymentId, ObjectArtifactStore, StoreConfig, StoreType,
};
use terraport_runner::{
    ProviderEnv, RunRequest, Runner, RunnerResult, Stage, StageExecutor, StageOutput,
};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Bucket the control side is configured with.
pub const BUCKET: &str = "terraport-test";

/// Outputs reported by the scripted output stage by default.
pub const REGION_OUTPUTS: &str =
    r#"{"region":{"sensitive":false,"type":"string","value":"us-east-1"}}"#;

/// A stage executor that replays scripted results.
#[derive(Default)]
pub struct ScriptedTool {
    responses: Mutex<HashMap<Stage, StageOutput>>,
    calls: Mutex<Vec<(Stage, Vec<(String, String)>)>>,
}

impl ScriptedTool {
    pub fn respond(&self, stage: Stage, output: StageOutput) {
        self.responses.lock().unwrap().insert(stage, output);
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.calls.lock().unwrap().iter().map(|c| c.0).collect()
    }

    pub fn env_for(&self, stage: Stage) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.0 == stage)
            .map(|c| c.1.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StageExecutor for ScriptedTool {
    async fn execute(
        &self,
        stage: Stage,
        _workdir: &Path,
        env: &ProviderEnv,
    ) -> RunnerResult<StageOutput> {
        let vars = env
            .names()
            .map(|name| (name.to_owned(), env.get(name).unwrap_or_default().to_owned()))
            .collect();
        self.calls.lock().unwrap().push((stage, vars));

        let scripted = self.responses.lock().unwrap().get(&stage).cloned();
        Ok(scripted.unwrap_or_else(|| match stage {
            Stage::Apply => StageOutput::ok("\x1b[32mApply complete! Resources: 1 added.\x1b[0m\n"),
            Stage::Output => StageOutput::ok(REGION_OUTPUTS),
            Stage::Init | Stage::Plan => StageOutput::ok(""),
        }))
    }
}

/// How the fake host answers the container command.
#[derive(Debug, Clone)]
pub enum ContainerBehaviour {
    /// Run the provisioning runner in-process.
    Run,
    /// Run the runner after a delay.
    Delay(Duration),
    /// Return fixed output without running anything.
    Fixed(CommandOutput),
}

/// An execution host backed by a local directory.
pub struct FakeRemote {
    root: TempDir,
    store: Arc<dyn ArtifactStore>,
    pub tool: Arc<ScriptedTool>,
    behaviour: Mutex<ContainerBehaviour>,
    fail_copies: AtomicBool,
    fail_cleanup: AtomicBool,
    commands: Mutex<Vec<String>>,
    copies: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            store,
            tool: Arc::new(ScriptedTool::default()),
            behaviour: Mutex::new(ContainerBehaviour::Run),
            fail_copies: AtomicBool::new(false),
            fail_cleanup: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
            copies: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behaviour(&self, behaviour: ContainerBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn fail_copies(&self) {
        self.fail_copies.store(true, Ordering::SeqCst);
    }

    pub fn fail_cleanup(&self) {
        self.fail_cleanup.store(true, Ordering::SeqCst);
    }

    /// Commands run so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Remote destinations of completed copies, in order.
    pub fn copies(&self) -> Vec<String> {
        self.copies.lock().unwrap().clone()
    }

    /// Store the in-container runner publishes to.
    ///
    /// Only a runner told about the control side's bucket reaches the shared
    /// store; anything else writes to a throwaway one, as a real container
    /// would.
    fn runner_store(&self, words: &[&str]) -> Arc<dyn ArtifactStore> {
        let expected = format!("TERRAPORT_RUNNER_ARTIFACTS__PATH={BUCKET}");
        if words.contains(&expected.as_str()) {
            self.store.clone()
        } else {
            Arc::new(ObjectArtifactStore::with_store(Arc::new(InMemory::new())))
        }
    }

    /// Local location of a remote path.
    pub fn local(&self, remote: &str) -> PathBuf {
        self.root.path().join(remote.trim_start_matches('/'))
    }

    async fn run_container(&self, words: &[&str]) -> CommandOutput {
        let behaviour = self.behaviour.lock().unwrap().clone();
        match behaviour {
            ContainerBehaviour::Fixed(output) => return output,
            ContainerBehaviour::Delay(delay) => tokio::time::sleep(delay).await,
            ContainerBehaviour::Run => {}
        }

        let Some(volume) = words
            .iter()
            .position(|w| *w == "-v")
            .and_then(|i| words.get(i + 1))
        else {
            return failure(125, "docker: no volume given");
        };
        let Some((host, mount)) = volume.split_once(':') else {
            return failure(125, "docker: invalid volume");
        };
        let [template, id, credentials] = &words[words.len() - 3..] else {
            return failure(125, "docker: missing runner arguments");
        };

        let host = self.local(host);
        let in_host = |path: &str| host.join(path.trim_start_matches(mount).trim_start_matches('/'));

        let request = RunRequest {
            template: in_host(*template),
            deployment_id: DeploymentId::parse(id).unwrap(),
            credentials: in_host(*credentials),
        };
        let runner = Runner::new(self.runner_store(words), self.tool.clone(), &host);
        let result = runner.run(&request).await;

        CommandOutput {
            exit_code: Some(if result.is_success() { 0 } else { 1 }),
            stdout: format!("{}\n", serde_json::to_string(&result).unwrap()),
            stderr: String::new(),
        }
    }
}

fn failure(exit_code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(exit_code),
        stdout: String::new(),
        stderr: stderr.to_owned(),
    }
}

fn success() -> CommandOutput {
    CommandOutput {
        exit_code: Some(0),
        ..CommandOutput::default()
    }
}

#[async_trait]
impl CommandRunner for FakeRemote {
    async fn run(&self, command: &str) -> ControlResult<CommandOutput> {
        self.commands.lock().unwrap().push(command.to_owned());
        let words: Vec<&str> = command.split_whitespace().collect();

        let output = match words.as_slice() {
            ["mkdir", "-p", path] => {
                std::fs::create_dir_all(self.local(path)).unwrap();
                success()
            }
            ["sudo", "rm", "-rf", path] | ["rm", "-rf", path] => {
                if self.fail_cleanup.load(Ordering::SeqCst) {
                    failure(1, "sudo: a password is required")
                } else {
                    let _ = std::fs::remove_dir_all(self.local(path));
                    success()
                }
            }
            ["docker", "run", ..] => self.run_container(&words).await,
            _ => failure(127, "command not found"),
        };
        Ok(output)
    }
}

#[async_trait]
impl FileTransport for FakeRemote {
    async fn copy_to(&self, local: &Path, remote: &str) -> ControlResult<()> {
        if self.fail_copies.load(Ordering::SeqCst) {
            return Err(ControlError::remote(
                format!("copy to {remote}"),
                Some(1),
                "scp: Connection closed",
            ));
        }

        let target = self.local(remote);
        if !target.parent().is_some_and(Path::exists) {
            return Err(ControlError::remote(
                format!("copy to {remote}"),
                Some(1),
                "scp: No such file or directory",
            ));
        }
        std::fs::copy(local, &target).unwrap();
        self.copies.lock().unwrap().push(remote.to_owned());
        Ok(())
    }
}

/// Build a zip archive holding the given files.
pub fn template_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A minimal template declaring one output.
pub fn minimal_template() -> Vec<u8> {
    template_zip(&[(
        "main.tf",
        "output \"region\" {\n  value = \"us-east-1\"\n}\n",
    )])
}

/// An orchestrator wired to a fake host and a shared in-memory store.
pub struct TestControl {
    pub objects: Arc<InMemory>,
    pub store: Arc<ObjectArtifactStore>,
    pub registry: Arc<MemoryRegistry>,
    pub remote: Arc<FakeRemote>,
    pub orchestrator: Arc<Orchestrator>,
    pub staging: TempDir,
}

impl TestControl {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(configure: impl FnOnce(&mut ControlConfig)) -> Self {
        let staging = tempfile::tempdir().unwrap();
        let mut config = ControlConfig::default();
        config.deployment.staging_dir = Some(staging.path().to_owned());
        config.artifacts = StoreConfig {
            storage_type: StoreType::S3,
            path: BUCKET.to_owned(),
            region: Some("us-east-1".to_owned()),
            ..StoreConfig::default()
        };
        configure(&mut config);

        let objects = Arc::new(InMemory::new());
        let store = Arc::new(ObjectArtifactStore::with_store(objects.clone()));
        let registry = Arc::new(MemoryRegistry::new());
        let remote = Arc::new(FakeRemote::new(store.clone()));
        let orchestrator = Arc::new(Orchestrator::new(
            registry.clone(),
            store.clone(),
            remote.clone(),
            remote.clone(),
            &config,
        ));

        Self {
            objects,
            store,
            registry,
            remote,
            orchestrator,
            staging,
        }
    }

    pub fn app(&self) -> axum::Router {
        router(AppState {
            orchestrator: self.orchestrator.clone(),
            max_upload_bytes: 1024 * 1024,
        })
    }

    pub async fn artifact(&self, key: &ArtifactKey) -> Option<String> {
        self.store
            .get(key)
            .await
            .unwrap()
            .map(|data| String::from_utf8(data.to_vec()).unwrap())
    }

    /// Number of objects in the artifact store.
    pub async fn object_count(&self) -> usize {
        self.objects.list(None).collect::<Vec<_>>().await.len()
    }

    /// Remote workspace directory for a deployment.
    pub fn workspace(&self, id: &DeploymentId) -> PathBuf {
        self.remote.local(&format!("/home/ec2-user/{id}"))
    }

    /// Returns true if no staging directories remain.
    pub fn staging_is_empty(&self) -> bool {
        std::fs::read_dir(self.staging.path()).unwrap().next().is_none()
    }
}
