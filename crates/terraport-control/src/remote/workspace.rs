//! Per-deployment directory on the execution host.

use terraport_core::DeploymentId;

use super::shell_quote;

/// File name of the template archive inside a workspace.
pub const TEMPLATE_FILE: &str = "template.zip";

/// File name of the credential bundle inside a workspace.
pub const CREDENTIALS_FILE: &str = "creds.json";

/// Remote workspace for one deployment: `{root}/{deployment_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteWorkspace {
    dir: String,
}

impl RemoteWorkspace {
    /// Workspace for a deployment under `root`.
    #[must_use]
    pub fn new(root: &str, id: &DeploymentId) -> Self {
        Self {
            dir: format!("{}/{id}", root.trim_end_matches('/')),
        }
    }

    /// Workspace directory.
    #[must_use]
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// Remote path of the template archive.
    #[must_use]
    pub fn template_path(&self) -> String {
        format!("{}/{TEMPLATE_FILE}", self.dir)
    }

    /// Remote path of the credential file.
    #[must_use]
    pub fn credentials_path(&self) -> String {
        format!("{}/{CREDENTIALS_FILE}", self.dir)
    }

    /// Command creating the workspace. Succeeds if it already exists.
    #[must_use]
    pub fn create_command(&self) -> String {
        format!("mkdir -p {}", shell_quote(&self.dir))
    }

    /// Command removing the workspace and everything in it.
    #[must_use]
    pub fn remove_command(&self, sudo: bool) -> String {
        let rm = format!("rm -rf {}", shell_quote(&self.dir));
        if sudo {
            format!("sudo {rm}")
        } else {
            rm
        }
    }
}
