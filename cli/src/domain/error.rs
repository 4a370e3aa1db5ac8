//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Run errors ────────────────────────────────────────────────────────────────

/// Errors that end a deploy, rollback or provisioning run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The remote host could not be reached or rejected authentication.
    #[error("Cannot connect to {host}: {reason}")]
    Connection { host: String, reason: String },

    /// A remote command exited non-zero.
    #[error("Command failed with exit code {exit_code}: {command}\n{stderr}")]
    RemoteCommand {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("No previous successful deployments to roll back to.")]
    NoRollbackTarget,

    /// A local git read or push failed.
    #[error("git {operation} failed: {message}")]
    LocalGit { operation: String, message: String },
}

impl DeployError {
    /// Short machine-readable code used by the JSON error object.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "CONNECTION_FAILED",
            Self::RemoteCommand { .. } => "REMOTE_COMMAND_FAILED",
            Self::NoRollbackTarget => "NO_ROLLBACK_TARGET",
            Self::LocalGit { .. } => "LOCAL_GIT_FAILED",
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while turning a configuration file into a profile.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run 'autodeploy init' first.")]
    NotFound,

    #[error("Missing required setting: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: &'static str,
        value: String,
        valid: String,
    },
}
