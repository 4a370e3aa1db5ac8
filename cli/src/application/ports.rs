//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`: never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::process::Output;

use anyhow::Result;

use crate::domain::config::DeployConfig;
use crate::domain::history::HistoryLedger;
use crate::domain::template;

// ── Value Types ───────────────────────────────────────────────────────────────

/// Exit status and captured output of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Options for [`RemoteSession::execute`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Return the result even when the command exits non-zero.
    pub ignore_failure: bool,
    /// Working directory; `None` means the deploy path.
    pub cwd: Option<String>,
}

impl ExecOptions {
    /// Fail on a non-zero exit.
    #[must_use]
    pub fn checked() -> Self {
        Self::default()
    }

    /// Return the result regardless of exit code.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            ignore_failure: true,
            cwd: None,
        }
    }

    #[must_use]
    pub fn in_dir(mut self, cwd: Option<&str>) -> Self {
        self.cwd = cwd.map(str::to_owned);
        self
    }
}

// ── Remote Session Port ───────────────────────────────────────────────────────

/// One authenticated channel to the target host.
///
/// Methods take `&mut self`: a session serves one run, one command at a time.
#[allow(async_fn_in_trait)]
pub trait RemoteSession {
    /// Establish the channel. A no-op when already connected.
    ///
    /// # Errors
    ///
    /// Fails with `DeployError::Connection` when the host is unreachable,
    /// rejects authentication or does not answer in time. Never retries.
    async fn connect(&mut self) -> Result<()>;

    /// Run `command` under `options.cwd` (default: the deploy path).
    ///
    /// # Errors
    ///
    /// Fails with `DeployError::RemoteCommand` on a non-zero exit unless
    /// `options.ignore_failure` is set, and with `DeployError::Connection`
    /// when the session is not connected.
    async fn execute(&mut self, command: &str, options: &ExecOptions) -> Result<CommandResult>;

    /// Copy `contents` to `remote_path` on the host.
    async fn upload(&mut self, contents: &[u8], remote_path: &str) -> Result<()>;

    /// Release the channel. Safe to call more than once.
    async fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Whether `path` exists on the host.
    async fn path_exists(&mut self, path: &str) -> Result<bool> {
        let result = self
            .execute(&template::path_probe(path), &ExecOptions::lenient().in_dir(Some("/")))
            .await?;
        Ok(result.stdout.contains(template::EXISTS_MARKER))
    }
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
}

// ── Git Port ──────────────────────────────────────────────────────────────────

/// Local repository reads and the push that precedes every deploy.
#[allow(async_fn_in_trait)]
pub trait GitGateway {
    async fn current_branch(&self) -> Result<String>;
    async fn head_commit(&self) -> Result<String>;
    async fn head_message(&self) -> Result<String>;
    /// Push `branch` to `remote`.
    ///
    /// # Errors
    ///
    /// Fails with `DeployError::LocalGit` when the push is rejected.
    async fn push(&self, remote: &str, branch: &str) -> Result<()>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Mark the in-progress step as failed.
    fn fail(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── State Ports ───────────────────────────────────────────────────────────────

/// Abstracts run history persistence (load/save).
#[allow(async_fn_in_trait)]
pub trait HistoryStore {
    /// Load the ledger; an absent file is an empty ledger.
    async fn load(&self) -> Result<HistoryLedger>;
    /// Persist the whole ledger.
    async fn save(&self, ledger: &HistoryLedger) -> Result<()>;
}

/// Abstracts `deploy-config.yml` load/save.
pub trait ConfigStore {
    /// Load the configuration.
    ///
    /// # Errors
    ///
    /// Fails with `ConfigError::NotFound` when the file does not exist.
    fn load(&self) -> Result<DeployConfig>;
    fn save(&self, config: &DeployConfig) -> Result<()>;
    fn path(&self) -> PathBuf;
    fn exists(&self) -> bool;
}
