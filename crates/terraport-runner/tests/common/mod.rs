//! Shared harness for runner integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use object_store::memory::InMemory;
use terraport_core::{
    ArtifactKey, ArtifactStore, CredentialBundle, CredentialFields, DeploymentId,
    ObjectArtifactStore,
};
use terraport_runner::{
    ProviderEnv, RunRequest, Runner, RunnerResult, Stage, StageExecutor, StageOutput,
};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Outputs reported by the scripted output stage by default.
pub const REGION_OUTPUTS: &str =
    r#"{"region":{"sensitive":false,"type":"string","value":"us-east-1"}}"#;

/// A stage executor that replays scripted results.
#[derive(Default)]
pub struct ScriptedTool {
    responses: Mutex<HashMap<Stage, StageOutput>>,
    calls: Mutex<Vec<(Stage, PathBuf, Vec<(String, String)>)>>,
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the response for one stage.
    pub fn respond(self, stage: Stage, output: StageOutput) -> Self {
        self.responses.lock().unwrap().insert(stage, output);
        self
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
            .map(|c| c.2.clone())
            .unwrap_or_default()
    }

    pub fn workdir(&self) -> Option<PathBuf> {
        self.calls.lock().unwrap().first().map(|c| c.1.clone())
    }
}

#[async_trait]
impl StageExecutor for ScriptedTool {
    async fn execute(
        &self,
        stage: Stage,
        workdir: &Path,
        env: &ProviderEnv,
    ) -> RunnerResult<StageOutput> {
        let vars = env
            .names()
            .map(|name| (name.to_owned(), env.get(name).unwrap_or_default().to_owned()))
            .collect();
        self.calls
            .lock()
            .unwrap()
            .push((stage, workdir.to_owned(), vars));

        let scripted = self.responses.lock().unwrap().get(&stage).cloned();
        Ok(scripted.unwrap_or_else(|| match stage {
            Stage::Apply => StageOutput::ok(
                "\x1b[0m\x1b[1m\x1b[32mApply complete! Resources: 1 added.\x1b[0m\n",
            ),
            Stage::Output => StageOutput::ok(REGION_OUTPUTS),
            Stage::Init | Stage::Plan => StageOutput::ok(""),
        }))
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

/// A populated workspace plus a runner wired to an in-memory store.
pub struct TestRunner {
    pub workspace: TempDir,
    pub store: Arc<ObjectArtifactStore>,
    pub tool: Arc<ScriptedTool>,
    pub runner: Runner,
}

impl TestRunner {
    pub fn new(tool: ScriptedTool) -> Self {
        let workspace = tempfile::tempdir().unwrap();
        let store = Arc::new(ObjectArtifactStore::with_store(Arc::new(InMemory::new())));
        let tool = Arc::new(tool);
        let runner = Runner::new(store.clone(), tool.clone(), workspace.path());

        Self {
            workspace,
            store,
            tool,
            runner,
        }
    }

    /// Write the template and credential file, returning the run request.
    pub fn stage(&self, id: &DeploymentId, template: &[u8], credentials: &[u8]) -> RunRequest {
        let template_path = self.workspace.path().join("template.zip");
        let credentials_path = self.workspace.path().join("creds.json");
        std::fs::write(&template_path, template).unwrap();
        std::fs::write(&credentials_path, credentials).unwrap();

        RunRequest {
            template: template_path,
            deployment_id: id.clone(),
            credentials: credentials_path,
        }
    }

    pub async fn artifact(&self, key: &ArtifactKey) -> Option<String> {
        self.store
            .get(key)
            .await
            .unwrap()
            .map(|data| String::from_utf8(data.to_vec()).unwrap())
    }
}

pub fn aws_credentials() -> Vec<u8> {
    CredentialBundle::from_fields("aws", CredentialFields::aws("AK", "SK"))
        .unwrap()
        .to_json()
        .unwrap()
}
