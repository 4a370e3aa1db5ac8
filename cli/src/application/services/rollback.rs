//! Application service: rollback use-case.
//!
//! Target selection happens before any connection is made; an empty or
//! one-deploy history fails with `NoRollbackTarget` and writes no record.

use anyhow::Result;
use chrono::Utc;

use crate::application::ports::{GitGateway, HistoryStore, ProgressReporter, RemoteSession};
use crate::application::services::record::{finish, release};
use crate::application::services::step_runner::execute_plan;
use crate::domain::history::{RunKind, RunRecord, RunStatus, short_commit};
use crate::domain::plan;
use crate::domain::profile::ProjectProfile;
use crate::domain::step::Action;

/// Resolve the commit to roll back to without touching the server.
///
/// # Errors
///
/// Returns `DeployError::NoRollbackTarget` when no explicit version is given
/// and the history holds fewer than two successful runs, or an error if the
/// history cannot be read.
pub async fn select_target(history: &impl HistoryStore, explicit: Option<&str>) -> Result<String> {
    let ledger = history.load().await?;
    Ok(ledger.select_rollback_target(explicit)?)
}

/// Check out `commit` on the server, rebuild and restart, then record the
/// outcome.
///
/// # Errors
///
/// Returns the error that aborted the run after the failed record has been
/// written, or an error if the history could not be saved.
pub async fn run_rollback(
    session: &mut impl RemoteSession,
    git: &impl GitGateway,
    history: &impl HistoryStore,
    reporter: &impl ProgressReporter,
    profile: &ProjectProfile,
    commit: &str,
) -> Result<RunRecord> {
    tracing::info!(project = %profile.name, %commit, "rollback started");
    let plan = plan::build(
        profile,
        &Action::Rollback {
            commit: commit.to_string(),
        },
    );
    let outcome = execute_plan(&plan, session, git, reporter).await;
    release(session).await;

    let record = RunRecord {
        branch: None,
        commit: commit.to_string(),
        message: Some(format!("Rollback to {}", short_commit(commit))),
        server_commit: None,
        status: RunStatus::Success,
        error: None,
        timestamp: Utc::now(),
        kind: RunKind::Rollback,
        failed_step: None,
        completed_steps: None,
    };
    finish(history, record, outcome).await
}
