//! Remote execution gateway.
//!
//! Two narrow interfaces cover everything the orchestrator needs from the
//! execution host: [`CommandRunner`] runs one shell command and
//! [`FileTransport`] copies one local file to a remote path. [`SshGateway`]
//! implements both with the system `ssh` and `scp` clients.

mod container;
mod ssh;
mod workspace;

pub use container::ContainerCommand;
pub use ssh::SshGateway;
pub use workspace::{RemoteWorkspace, CREDENTIALS_FILE, TEMPLATE_FILE};

use std::path::Path;

use async_trait::async_trait;

use crate::error::{ControlError, ControlResult};

/// Captured result of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true if the command exited zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into a [`ControlError::RemoteExecution`].
    pub fn check(self, operation: &str) -> ControlResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(ControlError::remote(operation, self.exit_code, self.stderr))
        }
    }
}

/// Runs shell commands on the execution host.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a single shell command and wait for it to finish.
    ///
    /// A command that runs and exits non-zero is reported through
    /// [`CommandOutput`]. Errors are reserved for failing to run it at all.
    async fn run(&self, command: &str) -> ControlResult<CommandOutput>;
}

/// Copies files to the execution host.
#[async_trait]
pub trait FileTransport: Send + Sync {
    /// Copy a local file to a remote path.
    async fn copy_to(&self, local: &Path, remote: &str) -> ControlResult<()>;
}

/// Quote a word for a POSIX shell.
///
/// Words made only of characters that are never special are returned
/// unchanged.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if plain {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
