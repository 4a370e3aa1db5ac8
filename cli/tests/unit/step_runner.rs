//! Step runner: ordering, failure policies, guards and captures.

#![allow(clippy::expect_used)]

use autodeploy_cli::application::services::step_runner::execute_plan;
use autodeploy_cli::domain::error::DeployError;
use autodeploy_cli::domain::profile::AppKind;
use autodeploy_cli::domain::step::{
    ActionKind, CaptureSlot, Guard, Plan, RemoteOp, Step, StepAction,
};

use crate::fakes::{FakeGit, FakeSession, RecordingReporter};

fn plan(steps: Vec<Step>) -> Plan {
    Plan {
        action: ActionKind::Deploy,
        kind: AppKind::Nodejs,
        steps,
    }
}

fn configured(command: &str, label: &str) -> Step {
    Step::remote(RemoteOp::Configured(command.to_string())).labeled(label)
}

#[tokio::test]
async fn fail_fast_failure_halts_the_remaining_steps() {
    let mut session = FakeSession::new().fail("npm run build", 2, "ELIFECYCLE");
    let git = FakeGit::at("c1");
    let reporter = RecordingReporter::default();
    let plan = plan(vec![
        configured("git pull origin main", "Pulling"),
        configured("npm run build", "Building"),
        configured("pm2 restart shop", "Restarting"),
    ]);

    let outcome = execute_plan(&plan, &mut session, &git, &reporter).await;

    assert!(!outcome.succeeded());
    assert_eq!(outcome.completed, 1);
    assert!(!session.ran("pm2 restart"));
    let failure = outcome.failure.expect("failure recorded");
    assert_eq!(failure.step, "Building");
    match failure.error.downcast_ref::<DeployError>() {
        Some(DeployError::RemoteCommand {
            exit_code, stderr, ..
        }) => {
            assert_eq!(*exit_code, 2);
            assert_eq!(stderr, "ELIFECYCLE");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        reporter.events(),
        [
            "step: Pulling",
            "ok: Pulling",
            "step: Building",
            "fail: Building"
        ]
    );
}

#[tokio::test]
async fn ignored_failure_never_halts_the_plan() {
    let mut session = FakeSession::new().fail("systemctl reload php", 5, "Unit not found");
    let git = FakeGit::at("c1");
    let reporter = RecordingReporter::default();
    let plan = plan(vec![
        configured("systemctl reload php8.1-fpm", "Reloading PHP-FPM").ignore_failure(),
        configured("echo done", "Finishing"),
    ]);

    let outcome = execute_plan(&plan, &mut session, &git, &reporter).await;

    assert!(outcome.succeeded());
    assert_eq!(outcome.completed, 2);
    assert_eq!(outcome.ignored, 1);
    assert!(session.ran("echo done"));
    assert!(
        reporter
            .events()
            .contains(&"warn: Reloading PHP-FPM failed, continuing".to_string())
    );
}

#[tokio::test]
async fn connection_failure_aborts_even_an_ignore_policy_step() {
    let mut session = FakeSession::unreachable();
    let git = FakeGit::at("c1");
    let reporter = RecordingReporter::default();
    let plan = plan(vec![
        configured("apt-get install -y git", "Installing git").ignore_failure(),
        configured("mkdir -p /var/www/shop", "Creating directory"),
    ]);

    let outcome = execute_plan(&plan, &mut session, &git, &reporter).await;

    let failure = outcome.failure.expect("connection failure");
    assert!(matches!(
        failure.error.downcast_ref::<DeployError>(),
        Some(DeployError::Connection { .. })
    ));
    assert!(session.commands.is_empty());
}

#[tokio::test]
async fn tool_guard_skips_install_when_tool_is_present() {
    let mut session = FakeSession::new().respond("command -v", "/usr/bin/git\n");
    let git = FakeGit::at("c1");
    let reporter = RecordingReporter::default();
    let plan = plan(vec![
        configured("apt-get install -y git", "Installing git")
            .when(Guard::ToolMissing("git".to_string())),
    ]);

    let outcome = execute_plan(&plan, &mut session, &git, &reporter).await;

    assert!(outcome.succeeded());
    assert_eq!(outcome.skipped, 1);
    assert!(!session.ran("apt-get"));
    assert_eq!(
        reporter.events(),
        ["step: Installing git", "ok: Installing git (already done)"]
    );
}

#[tokio::test]
async fn path_guard_runs_clone_when_path_is_missing() {
    let mut session = FakeSession::new();
    let git = FakeGit::at("c1");
    let reporter = RecordingReporter::default();
    let plan = plan(vec![
        Step::remote(RemoteOp::GitClone {
            repository: "git@example.com:acme/shop.git".to_string(),
            dest: "/var/www/shop".to_string(),
        })
        .when(Guard::PathMissing("/var/www/shop/.git".to_string())),
    ]);

    let outcome = execute_plan(&plan, &mut session, &git, &reporter).await;

    assert_eq!(outcome.skipped, 0);
    assert!(session.ran("test -e /var/www/shop/.git"));
    assert!(session.ran("git clone"));
}

#[tokio::test]
async fn capture_stores_trimmed_stdout() {
    let mut session = FakeSession::new().respond("git rev-parse HEAD", "abc123def\n");
    let git = FakeGit::at("c1");
    let reporter = RecordingReporter::default();
    let plan = plan(vec![Step::new(StepAction::Capture {
        op: RemoteOp::GitRevParseHead,
        slot: CaptureSlot::ServerCommit,
    })]);

    let outcome = execute_plan(&plan, &mut session, &git, &reporter).await;

    assert_eq!(outcome.captures.server_commit(), Some("abc123def"));
    assert!(reporter.events().is_empty(), "unlabeled steps are silent");
}

#[tokio::test]
async fn push_step_does_not_open_the_session() {
    let mut session = FakeSession::new();
    let git = FakeGit::at("c1");
    let reporter = RecordingReporter::default();
    let plan = plan(vec![Step::new(StepAction::Push {
        remote: "origin".to_string(),
        branch: "main".to_string(),
    })]);

    let outcome = execute_plan(&plan, &mut session, &git, &reporter).await;

    assert!(outcome.succeeded());
    assert_eq!(session.connects, 0);
    assert_eq!(git.pushes(), [("origin".to_string(), "main".to_string())]);
}

#[tokio::test]
async fn executable_file_is_uploaded_then_marked_executable() {
    let mut session = FakeSession::new();
    let git = FakeGit::at("c1");
    let reporter = RecordingReporter::default();
    let plan = plan(vec![Step::new(StepAction::WriteFile {
        path: "/var/www/shop/.git/hooks/post-receive".to_string(),
        contents: "#!/bin/bash\n".to_string(),
        executable: true,
    })]);

    execute_plan(&plan, &mut session, &git, &reporter).await;

    assert_eq!(session.uploads.len(), 1);
    assert_eq!(session.uploads[0].0, "/var/www/shop/.git/hooks/post-receive");
    assert!(session.ran("chmod 755 /var/www/shop/.git/hooks/post-receive"));
}
