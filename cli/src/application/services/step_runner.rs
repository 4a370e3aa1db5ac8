//! Application service: step runner.
//!
//! Executes plan steps strictly in order over one session. Labeled steps
//! emit progress events through the reporter; the runner never renders
//! anything itself.

use anyhow::Result;

use crate::application::ports::{ExecOptions, GitGateway, ProgressReporter, RemoteSession};
use crate::application::services::supervisor;
use crate::domain::error::DeployError;
use crate::domain::step::{Captures, FailurePolicy, Guard, Plan, Step, StepAction};
use crate::domain::template;

/// How a single step ended when it did not abort the plan.
#[derive(Debug)]
pub enum StepOutcome {
    Completed,
    /// The guard found the work already done.
    Skipped,
    /// The step failed under the ignore policy; the error is kept for logs.
    Ignored(anyhow::Error),
}

/// The fail-fast step that stopped a plan.
#[derive(Debug)]
pub struct StepFailure {
    /// Label (or description) of the failing step.
    pub step: String,
    pub error: anyhow::Error,
}

/// Result of running a whole plan.
#[derive(Debug, Default)]
pub struct PlanOutcome {
    pub captures: Captures,
    /// Steps that finished (completed, skipped or ignored) before any failure.
    pub completed: usize,
    pub skipped: usize,
    pub ignored: usize,
    pub failure: Option<StepFailure>,
}

impl PlanOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Convert into a `Result`, surfacing the failing step's error.
    ///
    /// # Errors
    ///
    /// Returns the error of the step that aborted the plan.
    pub fn into_result(self) -> Result<Captures> {
        match self.failure {
            None => Ok(self.captures),
            Some(failure) => Err(failure.error),
        }
    }
}

/// Run every step of `plan` in order, stopping at the first fail-fast
/// failure. The session is connected lazily before the first remote step.
pub async fn execute_plan(
    plan: &Plan,
    session: &mut impl RemoteSession,
    git: &impl GitGateway,
    reporter: &impl ProgressReporter,
) -> PlanOutcome {
    let mut outcome = PlanOutcome::default();
    tracing::debug!(action = ?plan.action, kind = %plan.kind, steps = plan.len(), "executing plan");

    for step in &plan.steps {
        match run_step(step, session, git, reporter, &mut outcome.captures).await {
            Ok(StepOutcome::Completed) => {}
            Ok(StepOutcome::Skipped) => outcome.skipped += 1,
            Ok(StepOutcome::Ignored(_)) => outcome.ignored += 1,
            Err(error) => {
                outcome.failure = Some(StepFailure {
                    step: step.describe(),
                    error,
                });
                return outcome;
            }
        }
        outcome.completed += 1;
    }
    outcome
}

/// Run one step, applying its guard and failure policy.
///
/// # Errors
///
/// Returns the step's error under the fail-fast policy. Connection errors
/// abort the run under either policy.
pub async fn run_step(
    step: &Step,
    session: &mut impl RemoteSession,
    git: &impl GitGateway,
    reporter: &impl ProgressReporter,
    captures: &mut Captures,
) -> Result<StepOutcome> {
    if let Some(label) = &step.label {
        reporter.step(label);
    }

    match perform(step, session, git, captures).await {
        Ok(outcome) => {
            if let Some(label) = &step.label {
                match outcome {
                    StepOutcome::Skipped => reporter.success(&format!("{label} (already done)")),
                    _ => reporter.success(label),
                }
            }
            Ok(outcome)
        }
        Err(error) if step.policy == FailurePolicy::Ignore && !is_connection_error(&error) => {
            tracing::warn!(step = %step.describe(), error = %format!("{error:#}"), "ignoring failed step");
            if let Some(label) = &step.label {
                reporter.warn(&format!("{label} failed, continuing"));
            }
            Ok(StepOutcome::Ignored(error))
        }
        Err(error) => {
            if let Some(label) = &step.label {
                reporter.fail(label);
            }
            Err(error)
        }
    }
}

fn is_connection_error(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<DeployError>(),
        Some(DeployError::Connection { .. })
    )
}

async fn perform(
    step: &Step,
    session: &mut impl RemoteSession,
    git: &impl GitGateway,
    captures: &mut Captures,
) -> Result<StepOutcome> {
    if step.action.is_remote() {
        session.connect().await?;
    }
    let cwd = step.cwd.as_deref();

    if let Some(guard) = &step.guard {
        if !guard_holds(guard, session, cwd).await? {
            tracing::debug!(step = %step.describe(), ?guard, "precondition not met; skipping");
            return Ok(StepOutcome::Skipped);
        }
    }

    match &step.action {
        StepAction::Push { remote, branch } => git.push(remote, branch).await?,
        StepAction::Remote(op) => {
            session
                .execute(&op.render(captures), &ExecOptions::checked().in_dir(cwd))
                .await?;
        }
        StepAction::Capture { op, slot } => {
            let result = session
                .execute(&op.render(captures), &ExecOptions::checked().in_dir(cwd))
                .await?;
            captures.set(*slot, &result.stdout);
        }
        StepAction::EnsureProcess { name, launch } => {
            let outcome = supervisor::ensure_running(session, name, launch, cwd).await?;
            tracing::debug!(process = %name, ?outcome, "process ensured");
        }
        StepAction::WriteFile {
            path,
            contents,
            executable,
        } => {
            session.upload(contents.as_bytes(), path).await?;
            if *executable {
                session
                    .execute(
                        &template::make_executable(path),
                        &ExecOptions::checked().in_dir(Some("/")),
                    )
                    .await?;
            }
        }
    }
    Ok(StepOutcome::Completed)
}

/// Whether the guarded step still has work to do.
async fn guard_holds(
    guard: &Guard,
    session: &mut impl RemoteSession,
    cwd: Option<&str>,
) -> Result<bool> {
    match guard {
        Guard::ToolMissing(tool) => {
            let probe = session
                .execute(&template::tool_probe(tool), &ExecOptions::lenient().in_dir(cwd))
                .await?;
            Ok(probe.stdout.trim().is_empty())
        }
        Guard::PathMissing(path) => Ok(!session.path_exists(path).await?),
    }
}
