//! Infrastructure implementation of the `GitGateway` port.
//!
//! Shells out to the local `git` binary in the working directory.

use std::process::Output;

use anyhow::Result;

use crate::application::ports::{CommandRunner, GitGateway};
use crate::domain::error::DeployError;
use crate::infra::command_runner::{LOCAL_GIT_TIMEOUT, TokioCommandRunner};

pub struct LocalGit<R: CommandRunner = TokioCommandRunner> {
    runner: R,
}

impl LocalGit<TokioCommandRunner> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_runner(TokioCommandRunner::new(LOCAL_GIT_TIMEOUT))
    }
}

impl Default for LocalGit<TokioCommandRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> LocalGit<R> {
    #[must_use]
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    async fn git(&self, operation: &str, args: &[&str]) -> Result<String> {
        let output = self
            .runner
            .run("git", args)
            .await
            .map_err(|e| local_git(operation, format!("{e:#}")))?;
        check(operation, &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn local_git(operation: &str, message: impl Into<String>) -> anyhow::Error {
    DeployError::LocalGit {
        operation: operation.to_string(),
        message: message.into(),
    }
    .into()
}

fn check(operation: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = match stderr.trim() {
        "" => format!("exit code {}", output.status.code().unwrap_or(-1)),
        text => text.to_string(),
    };
    Err(local_git(operation, message))
}

impl<R: CommandRunner> GitGateway for LocalGit<R> {
    async fn current_branch(&self) -> Result<String> {
        self.git("rev-parse", &["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    async fn head_commit(&self) -> Result<String> {
        self.git("rev-parse", &["rev-parse", "HEAD"]).await
    }

    async fn head_message(&self) -> Result<String> {
        self.git("log", &["log", "-1", "--pretty=%B"]).await
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        tracing::debug!(%remote, %branch, "git push");
        self.git("push", &["push", remote, branch]).await.map(drop)
    }
}
