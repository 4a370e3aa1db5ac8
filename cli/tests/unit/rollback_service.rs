//! Rollback use-case: target selection and recording.

#![allow(clippy::expect_used)]

use autodeploy_cli::application::services::rollback::{run_rollback, select_target};
use autodeploy_cli::domain::error::DeployError;
use autodeploy_cli::domain::history::{RunKind, RunStatus};

use crate::fakes::{FakeGit, FakeSession, MemoryHistory, RecordingReporter, node_profile, record};

fn history_with_failed_head() -> MemoryHistory {
    MemoryHistory::with(vec![
        record("c3", RunStatus::Failed, 1),
        record("c2", RunStatus::Success, 10),
        record("c1", RunStatus::Success, 20),
    ])
}

#[tokio::test]
async fn selects_the_success_before_the_current_one() {
    let history = history_with_failed_head();

    let target = select_target(&history, None).await.expect("target");

    assert_eq!(target, "c1");
}

#[tokio::test]
async fn rollback_checks_out_target_and_records_it() {
    let history = history_with_failed_head();
    let mut session = FakeSession::new();
    let git = FakeGit::at("c3");
    let reporter = RecordingReporter::default();
    let profile = node_profile("npm start");

    let target = select_target(&history, None).await.expect("target");
    let record = run_rollback(&mut session, &git, &history, &reporter, &profile, &target)
        .await
        .expect("rollback");

    assert_eq!(session.commands[0], "git checkout c1");
    assert!(session.ran("pm2 restart shop"));
    assert!(git.pushes().is_empty());
    assert_eq!(record.kind, RunKind::Rollback);
    assert_eq!(record.status, RunStatus::Success);
    assert_eq!(record.commit, "c1");
    assert_eq!(record.message.as_deref(), Some("Rollback to c1"));
    assert_eq!(record.branch, None);

    let records = history.records();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0], record);
    assert_eq!(session.disconnects, 1);
}

#[tokio::test]
async fn empty_history_has_no_target_and_writes_nothing() {
    let history = MemoryHistory::default();

    let error = select_target(&history, None).await.expect_err("no target");

    assert!(matches!(
        error.downcast_ref::<DeployError>(),
        Some(DeployError::NoRollbackTarget)
    ));
    assert_eq!(history.save_count(), 0);
}

#[tokio::test]
async fn single_success_has_no_target() {
    let history = MemoryHistory::with(vec![record("c1", RunStatus::Success, 5)]);

    assert!(select_target(&history, None).await.is_err());
}

#[tokio::test]
async fn explicit_version_bypasses_history() {
    let history = MemoryHistory::default();

    let target = select_target(&history, Some(" deadbeef ")).await.expect("target");

    assert_eq!(target, "deadbeef");
}

#[tokio::test]
async fn failed_checkout_records_a_failed_rollback() {
    let history = history_with_failed_head();
    let mut session = FakeSession::new().fail("git checkout", 128, "pathspec did not match");
    let git = FakeGit::at("c3");
    let reporter = RecordingReporter::default();
    let profile = node_profile("npm start");

    let result = run_rollback(
        &mut session,
        &git,
        &history,
        &reporter,
        &profile,
        "0123456789abcdef",
    )
    .await;

    assert!(result.is_err());
    let head = &history.records()[0];
    assert_eq!(head.kind, RunKind::Rollback);
    assert_eq!(head.status, RunStatus::Failed);
    assert_eq!(head.message.as_deref(), Some("Rollback to 0123456"));
    assert_eq!(head.failed_step.as_deref(), Some("Checking out 0123456"));
    assert_eq!(head.completed_steps, Some(0));
    assert!(!session.ran("pm2"));
}
