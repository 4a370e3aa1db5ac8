//! Application service: deploy use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Every call writes exactly one run record and leaves the session
//! disconnected, on success and on failure alike.

use anyhow::Result;
use chrono::Utc;

use crate::application::ports::{GitGateway, HistoryStore, ProgressReporter, RemoteSession};
use crate::application::services::record::{finish, release};
use crate::application::services::step_runner::{PlanOutcome, StepFailure, execute_plan};
use crate::domain::history::{RunKind, RunRecord, RunStatus, UNKNOWN_COMMIT};
use crate::domain::plan;
use crate::domain::profile::ProjectProfile;
use crate::domain::step::Action;

/// Inputs of one deploy.
pub struct DeployRequest<'a> {
    pub profile: &'a ProjectProfile,
    /// Local git remote the branch is pushed to.
    pub remote: &'a str,
    pub branch: &'a str,
}

struct LocalHead {
    commit: String,
    message: String,
}

/// Push, pull and restart the application, then record the outcome.
///
/// Local git reads and the push happen before the session is opened; when
/// either fails no connection is attempted.
///
/// # Errors
///
/// Returns the error that aborted the run after the failed record has been
/// written, or an error if the history could not be saved.
pub async fn run_deploy(
    session: &mut impl RemoteSession,
    git: &impl GitGateway,
    history: &impl HistoryStore,
    reporter: &impl ProgressReporter,
    request: DeployRequest<'_>,
) -> Result<RunRecord> {
    let DeployRequest {
        profile,
        remote,
        branch,
    } = request;
    tracing::info!(project = %profile.name, %branch, kind = %profile.kind, "deploy started");

    let head = read_head(git).await;
    let (commit, message, outcome) = match head {
        Ok(head) => {
            let plan = plan::build(
                profile,
                &Action::Deploy {
                    remote: remote.to_string(),
                    branch: branch.to_string(),
                },
            );
            let outcome = execute_plan(&plan, session, git, reporter).await;
            (head.commit, Some(head.message), outcome)
        }
        Err(error) => {
            reporter.fail("Reading local repository");
            let outcome = PlanOutcome {
                failure: Some(StepFailure {
                    step: "Reading local repository".to_string(),
                    error,
                }),
                ..PlanOutcome::default()
            };
            (UNKNOWN_COMMIT.to_string(), None, outcome)
        }
    };

    release(session).await;

    let record = RunRecord {
        branch: Some(branch.to_string()),
        commit,
        message,
        server_commit: outcome.captures.server_commit().map(str::to_owned),
        status: RunStatus::Success,
        error: None,
        timestamp: Utc::now(),
        kind: RunKind::Deploy,
        failed_step: None,
        completed_steps: None,
    };
    finish(history, record, outcome).await
}

async fn read_head(git: &impl GitGateway) -> Result<LocalHead> {
    Ok(LocalHead {
        commit: git.head_commit().await?,
        message: git.head_message().await?,
    })
}
