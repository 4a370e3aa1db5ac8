//! Infrastructure implementation of the `RemoteSession` port over OpenSSH.
//!
//! `connect` starts a ControlMaster in the background with its socket in a
//! private temporary directory. Every later command and file copy
//! multiplexes over that one authenticated channel, so credentials are used
//! exactly once per run. Password authentication goes through `sshpass -e`
//! with the password in the `SSHPASS` environment variable.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::application::ports::{CommandResult, CommandRunner, ExecOptions, RemoteSession};
use crate::domain::error::DeployError;
use crate::domain::profile::{Auth, RemoteTarget};
use crate::domain::template;
use crate::infra::command_runner::{CONNECT_TIMEOUT, TokioCommandRunner};

/// ssh exits with 255 when the connection itself failed.
const SSH_CONNECTION_FAILURE: i32 = 255;

/// sshpass exits with 5 when the password was rejected.
const SSHPASS_BAD_PASSWORD: i32 = 5;

/// Longest stderr excerpt carried in a `RemoteCommand` error.
const STDERR_EXCERPT: usize = 2000;

/// A single persistent session to the deploy host.
pub struct OpenSshSession<R: CommandRunner = TokioCommandRunner> {
    target: RemoteTarget,
    deploy_path: String,
    runner: R,
    /// Holds the control socket; `Some` while connected.
    control_dir: Option<TempDir>,
}

impl OpenSshSession<TokioCommandRunner> {
    /// Session for `target` whose commands default to `deploy_path`.
    #[must_use]
    pub fn new(target: RemoteTarget, deploy_path: impl Into<String>) -> Self {
        let mut runner =
            TokioCommandRunner::new(Duration::from_secs(target.command_timeout_secs));
        if let Auth::Password(password) = &target.auth {
            runner = runner.with_env("SSHPASS", password.clone());
        }
        Self::with_runner(target, deploy_path, runner)
    }
}

impl<R: CommandRunner> OpenSshSession<R> {
    #[must_use]
    pub fn with_runner(target: RemoteTarget, deploy_path: impl Into<String>, runner: R) -> Self {
        Self {
            target,
            deploy_path: deploy_path.into(),
            runner,
            control_dir: None,
        }
    }

    fn socket(&self) -> Option<PathBuf> {
        self.control_dir.as_ref().map(|d| d.path().join("cm"))
    }

    fn connection_error(&self, reason: impl Into<String>) -> anyhow::Error {
        DeployError::Connection {
            host: self.target.host.clone(),
            reason: reason.into(),
        }
        .into()
    }

    /// Program and arguments that start the master connection.
    fn master_command(&self, socket: &Path, log: &Path) -> (String, Vec<String>) {
        let mut args = Vec::new();
        let program = match &self.target.auth {
            Auth::Password(_) => {
                args.extend(["-e".to_string(), "ssh".to_string()]);
                "sshpass".to_string()
            }
            Auth::Key(_) => "ssh".to_string(),
        };
        args.extend(["-M".to_string(), "-N".to_string(), "-f".to_string()]);
        args.extend(self.common_options(socket));
        args.extend(option(&format!("ConnectTimeout={}", CONNECT_TIMEOUT.as_secs())));
        args.extend(option("ControlPersist=yes"));
        args.extend(option("StrictHostKeyChecking=accept-new"));
        args.extend(option("ServerAliveInterval=30"));
        match &self.target.auth {
            Auth::Key(key) => {
                args.extend(["-i".to_string(), key.display().to_string()]);
                args.extend(option("BatchMode=yes"));
                args.extend(option("IdentitiesOnly=yes"));
            }
            Auth::Password(_) => {
                args.extend(option("PreferredAuthentications=password,keyboard-interactive"));
                args.extend(option("PubkeyAuthentication=no"));
                args.extend(option("NumberOfPasswordPrompts=1"));
            }
        }
        // Detached master must not hold our stderr pipe open.
        args.extend(["-E".to_string(), log.display().to_string()]);
        args.push(self.target.destination());
        (program, args)
    }

    /// Arguments for a command multiplexed over the master.
    fn exec_args(&self, socket: &Path, remote_command: &str) -> Vec<String> {
        let mut args = self.common_options(socket);
        args.extend(option("ControlMaster=no"));
        args.push(self.target.destination());
        args.push(remote_command.to_string());
        args
    }

    fn common_options(&self, socket: &Path) -> Vec<String> {
        let mut args = vec!["-p".to_string(), self.target.port.to_string()];
        args.extend(option(&format!("ControlPath={}", socket.display())));
        args
    }
}

fn option(value: &str) -> [String; 2] {
    ["-o".to_string(), value.to_string()]
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}

fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

impl<R: CommandRunner> RemoteSession for OpenSshSession<R> {
    async fn connect(&mut self) -> Result<()> {
        if self.control_dir.is_some() {
            return Ok(());
        }
        let dir = tempfile::Builder::new()
            .prefix("autodeploy-ssh-")
            .tempdir()
            .context("cannot create control socket directory")?;
        let socket = dir.path().join("cm");
        let log = dir.path().join("master.log");
        let (program, args) = self.master_command(&socket, &log);
        tracing::debug!(host = %self.target.host, port = self.target.port, "opening ssh master");

        let output = self
            .runner
            .run_with_timeout(&program, &as_strs(&args), CONNECT_TIMEOUT + Duration::from_secs(5))
            .await
            .map_err(|e| self.connection_error(format!("{e:#}")))?;

        if !output.status.success() {
            let code = exit_code(&output);
            let log_text = std::fs::read_to_string(&log).unwrap_or_default();
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = if program == "sshpass" && code == SSHPASS_BAD_PASSWORD {
                "authentication failed (password rejected)".to_string()
            } else {
                let detail = format!("{}\n{}", stderr.trim(), log_text.trim());
                match detail.trim() {
                    "" => format!("{program} exited with code {code}"),
                    text => excerpt(text),
                }
            };
            return Err(self.connection_error(reason));
        }

        self.control_dir = Some(dir);
        tracing::info!(host = %self.target.host, "connected");
        Ok(())
    }

    async fn execute(&mut self, command: &str, options: &ExecOptions) -> Result<CommandResult> {
        let Some(socket) = self.socket() else {
            return Err(self.connection_error("session is not connected"));
        };
        let cwd = options.cwd.as_deref().unwrap_or(&self.deploy_path);
        let remote = template::in_dir(cwd, command);
        tracing::debug!(%command, %cwd, "remote exec");

        let args = self.exec_args(&socket, &remote);
        let output = self
            .runner
            .run("ssh", &as_strs(&args))
            .await
            .with_context(|| format!("running remote command: {command}"))?;

        let result = CommandResult {
            exit_code: exit_code(&output),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        // A remote command exiting 255 is indistinguishable from a dropped
        // connection; both are treated as the latter.
        if result.exit_code == SSH_CONNECTION_FAILURE {
            return Err(self.connection_error(excerpt(&result.stderr)));
        }
        if !result.success() && !options.ignore_failure {
            return Err(DeployError::RemoteCommand {
                command: command.to_string(),
                exit_code: result.exit_code,
                stderr: excerpt(&result.stderr),
            }
            .into());
        }
        Ok(result)
    }

    async fn upload(&mut self, contents: &[u8], remote_path: &str) -> Result<()> {
        let (Some(socket), Some(dir)) = (self.socket(), self.control_dir.as_ref()) else {
            return Err(self.connection_error("session is not connected"));
        };
        let mut local = tempfile::NamedTempFile::new_in(dir.path())
            .context("cannot create upload staging file")?;
        std::io::Write::write_all(&mut local, contents).context("cannot stage upload")?;

        let mut args = vec!["-q".to_string(), "-P".to_string(), self.target.port.to_string()];
        args.extend(option(&format!("ControlPath={}", socket.display())));
        args.extend(option("ControlMaster=no"));
        args.push(local.path().display().to_string());
        args.push(format!("{}:{remote_path}", self.target.destination()));
        tracing::debug!(%remote_path, bytes = contents.len(), "upload");

        let output = self
            .runner
            .run("scp", &as_strs(&args))
            .await
            .with_context(|| format!("copying file to {remote_path}"))?;
        if !output.status.success() {
            return Err(DeployError::RemoteCommand {
                command: format!("scp {remote_path}"),
                exit_code: exit_code(&output),
                stderr: excerpt(&String::from_utf8_lossy(&output.stderr)),
            }
            .into());
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(socket) = self.socket() else {
            return Ok(());
        };
        let mut args = self.common_options(&socket);
        args.extend(["-O".to_string(), "exit".to_string(), self.target.destination()]);
        let result = self.runner.run_with_timeout("ssh", &as_strs(&args), CONNECT_TIMEOUT).await;
        // The directory goes either way; a stale master dies with its socket.
        self.control_dir = None;
        let output = result.context("closing ssh master")?;
        if !output.status.success() {
            tracing::warn!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "ssh master did not exit cleanly"
            );
        }
        tracing::debug!(host = %self.target.host, "disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.control_dir.is_some()
    }
}

impl<R: CommandRunner> Drop for OpenSshSession<R> {
    fn drop(&mut self) {
        let Some(socket) = self.socket() else {
            return;
        };
        tracing::debug!("closing ssh master on drop");
        let mut args = self.common_options(&socket);
        args.extend(["-O".to_string(), "exit".to_string(), self.target.destination()]);
        let _ = std::process::Command::new("ssh")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
}
