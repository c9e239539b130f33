//! ssh/scp implementation of the remote execution gateway.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{CommandOutput, CommandRunner, FileTransport};
use crate::config::RemoteConfig;
use crate::error::{ControlError, ControlResult};

/// Gateway to one execution host over ssh.
///
/// Every invocation runs non-interactively with the configured identity.
/// Child processes are killed if the calling future is dropped.
#[derive(Debug, Clone)]
pub struct SshGateway {
    host: String,
    user: String,
    port: u16,
    identity_file: Option<PathBuf>,
    strict_host_key_checking: bool,
    connect_timeout_secs: u64,
}

impl SshGateway {
    /// Create a gateway from remote host configuration.
    #[must_use]
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            host: config.host.clone(),
            user: config.user.clone(),
            port: config.port,
            identity_file: config.identity_file.clone(),
            strict_host_key_checking: config.strict_host_key_checking,
            connect_timeout_secs: config.connect_timeout_secs,
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Options shared by ssh and scp. `port_flag` is `-p` for ssh, `-P` for scp.
    fn base_command(&self, program: &str, port_flag: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!(
                "StrictHostKeyChecking={}",
                if self.strict_host_key_checking {
                    "yes"
                } else {
                    "no"
                }
            ))
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout_secs))
            .arg(port_flag)
            .arg(self.port.to_string());

        if let Some(identity) = &self.identity_file {
            cmd.arg("-i").arg(identity);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn ssh_command(&self, command: &str) -> Command {
        let mut cmd = self.base_command("ssh", "-p");
        cmd.arg(self.destination()).arg("--").arg(command);
        cmd
    }

    fn scp_command(&self, local: &Path, remote: &str) -> Command {
        let mut cmd = self.base_command("scp", "-P");
        cmd.arg(local)
            .arg(format!("{}:{remote}", self.destination()));
        cmd
    }
}

#[async_trait]
impl CommandRunner for SshGateway {
    async fn run(&self, command: &str) -> ControlResult<CommandOutput> {
        debug!(host = %self.host, "running remote command");

        let output = self
            .ssh_command(command)
            .output()
            .await
            .map_err(|e| ControlError::remote("ssh", None, format!("failed to spawn ssh: {e}")))?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl FileTransport for SshGateway {
    async fn copy_to(&self, local: &Path, remote: &str) -> ControlResult<()> {
        debug!(host = %self.host, local = %local.display(), remote, "copying file");
        let operation = format!("copy to {remote}");

        let output = self
            .scp_command(local, remote)
            .output()
            .await
            .map_err(|e| {
                ControlError::remote(&operation, None, format!("failed to spawn scp: {e}"))
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ControlError::remote(
                operation,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ))
        }
    }
}
