//! Application service: first-time server provisioning.
//!
//! Runs the provisioning plan: directories, best-effort tool installs,
//! clone, git hook and the optional virtual host. No run record is written.

use anyhow::Result;

use crate::application::ports::{GitGateway, ProgressReporter, RemoteSession};
use crate::application::services::record::release;
use crate::application::services::step_runner::execute_plan;
use crate::domain::plan;
use crate::domain::profile::ProjectProfile;
use crate::domain::step::Action;

/// Summary of a finished provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionReport {
    pub completed: usize,
    /// Steps whose work was already done on the server.
    pub skipped: usize,
    /// Best-effort steps that failed.
    pub ignored: usize,
}

/// Prepare the server for deployments of `profile`.
///
/// # Errors
///
/// Returns an error if a fail-fast step fails (directory creation, clone,
/// hook installation) or the host cannot be reached.
pub async fn run_provision(
    session: &mut impl RemoteSession,
    git: &impl GitGateway,
    reporter: &impl ProgressReporter,
    profile: &ProjectProfile,
    repository: &str,
    branch: &str,
) -> Result<ProvisionReport> {
    tracing::info!(project = %profile.name, host_path = %profile.deploy_path, "provisioning");
    let plan = plan::build(
        profile,
        &Action::Provision {
            repository: repository.to_string(),
            branch: branch.to_string(),
        },
    );
    let outcome = execute_plan(&plan, session, git, reporter).await;
    release(session).await;

    let report = ProvisionReport {
        completed: outcome.completed,
        skipped: outcome.skipped,
        ignored: outcome.ignored,
    };
    outcome.into_result()?;
    Ok(report)
}
