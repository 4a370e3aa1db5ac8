//! Status and logs: read-only probes over one session.

#![allow(clippy::expect_used)]

use autodeploy_cli::application::services::logs::{Excerpt, MAX_WEB_SERVER_LINES, collect_logs};
use autodeploy_cli::application::services::status::{ProcessState, RECENT_RUNS, collect_status};
use autodeploy_cli::domain::history::RunStatus;
use autodeploy_cli::domain::profile::AppKind;

use crate::fakes::{FakeSession, MemoryHistory, node_profile, profile, record};

const JLIST: &str = r#"[{"name":"shop","pm2_env":{"status":"online","pm_uptime":1700000000000,"restart_time":2},"monit":{"memory":52428800,"cpu":1.5}}]"#;

#[tokio::test]
async fn status_reports_host_process_and_recent_runs() {
    let mut session = FakeSession::new()
        .respond("uptime -p", "up 3 days, 4 hours\n")
        .respond("free -h", "Mem:  3.8Gi  1.2Gi  1.1Gi  12Mi  1.5Gi  2.3Gi\n")
        .respond("df -h /", "/dev/vda1  40G  12G  28G  30% /\n")
        .respond("--abbrev-ref", "main\n")
        .respond("git log -1", "abc1234 - Add checkout page (2 hours ago)\n")
        .respond("pm2 jlist", JLIST);
    let records: Vec<_> = (0..8_i64)
        .map(|i| record(&format!("c{i}"), RunStatus::Success, i))
        .collect();
    let history = MemoryHistory::with(records);

    let status = collect_status(&mut session, &history, &node_profile("npm start"))
        .await
        .expect("status");

    assert_eq!(status.uptime.as_deref(), Some("up 3 days, 4 hours"));
    assert_eq!(status.branch.as_deref(), Some("main"));
    assert!(status.memory.is_some());
    assert!(status.disk.is_some());
    match status.process {
        Some(ProcessState::Running(info)) => {
            assert!(info.is_online());
            assert_eq!(info.restarts, 2);
        }
        other => panic!("unexpected process state: {other:?}"),
    }
    assert_eq!(status.domain, None);
    assert_eq!(status.recent.len(), RECENT_RUNS);
    assert_eq!(status.recent[0].commit, "c0");
    assert_eq!(history.save_count(), 0);
    assert_eq!(session.disconnects, 1);
}

#[tokio::test]
async fn status_tolerates_failing_probes() {
    let mut session = FakeSession::new()
        .fail("uptime -p", 127, "uptime: not found")
        .fail("git log", 128, "not a git repository")
        .respond("pm2 jlist", "[]");

    let status = collect_status(&mut session, &MemoryHistory::default(), &node_profile("npm start"))
        .await
        .expect("status");

    assert_eq!(status.uptime, None);
    assert_eq!(status.last_commit, None);
    assert_eq!(status.process, Some(ProcessState::NotRegistered));
    assert!(status.recent.is_empty());
}

#[tokio::test]
async fn unsupervised_projects_skip_the_process_probe() {
    let mut session = FakeSession::new();

    let status = collect_status(&mut session, &MemoryHistory::default(), &profile(AppKind::Php))
        .await
        .expect("status");

    assert_eq!(status.process, None);
    assert!(!session.ran("pm2"));
}

#[tokio::test]
async fn status_on_unreachable_host_fails() {
    let mut session = FakeSession::unreachable();

    let result = collect_status(&mut session, &MemoryHistory::default(), &profile(AppKind::Php)).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn logs_cover_every_applicable_source() {
    let mut session = FakeSession::new()
        .respond("test -e", "exists\n")
        .respond("tail -n 30 /var/www/shop/.autodeploy/deployments.log", "2024-05-01 10:00:00 - abc\n")
        .respond("pm2 logs shop", "listening on 3000\n")
        .respond("/var/log/nginx/error.log", "");
    let mut shop = node_profile("npm start");
    shop.domain = Some("shop.example.com".to_string());

    let report = collect_logs(&mut session, &shop, 30).await.expect("logs");

    assert_eq!(
        report.deployments,
        Excerpt::Lines("2024-05-01 10:00:00 - abc".to_string())
    );
    assert_eq!(report.application, Excerpt::Lines("listening on 3000".to_string()));
    assert_eq!(report.web_server, Excerpt::Empty);
    assert!(session.ran(&format!("tail -n {MAX_WEB_SERVER_LINES} /var/log/nginx/error.log")));
    assert_eq!(session.disconnects, 1);
}

#[tokio::test]
async fn logs_without_marker_file_or_process() {
    let mut session = FakeSession::new();

    let report = collect_logs(&mut session, &profile(AppKind::Php), 50)
        .await
        .expect("logs");

    assert_eq!(report.deployments, Excerpt::Empty);
    assert_eq!(report.application, Excerpt::NotApplicable);
    assert_eq!(report.web_server, Excerpt::NotApplicable);
    assert!(!session.ran("tail"));
}
