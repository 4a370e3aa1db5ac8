//! Hand-written fakes for the application ports.
//!
//! The session records every command it is asked to run and answers from a
//! script of `(substring, result)` pairs; unmatched commands succeed with
//! empty output.

#![allow(clippy::expect_used, dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{Duration, Utc};

use autodeploy_cli::application::ports::{
    CommandResult, ConfigStore, ExecOptions, GitGateway, HistoryStore, ProgressReporter,
    RemoteSession,
};
use autodeploy_cli::domain::config::DeployConfig;
use autodeploy_cli::domain::error::DeployError;
use autodeploy_cli::domain::history::{HistoryLedger, RunKind, RunRecord, RunStatus};
use autodeploy_cli::domain::profile::{AppKind, BuildDirectives, ProjectProfile};

// ── Remote session ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeSession {
    connected: bool,
    pub refuse_connection: bool,
    pub connects: usize,
    pub disconnects: usize,
    /// Commands in execution order, without the `cd` prefix.
    pub commands: Vec<String>,
    pub uploads: Vec<(String, String)>,
    script: Vec<(String, CommandResult)>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            refuse_connection: true,
            ..Self::default()
        }
    }

    /// Answer commands containing `needle` with `stdout` and exit 0.
    pub fn respond(mut self, needle: &str, stdout: &str) -> Self {
        self.script.push((
            needle.to_string(),
            CommandResult {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
        self
    }

    /// Make commands containing `needle` exit with `code`.
    pub fn fail(mut self, needle: &str, code: i32, stderr: &str) -> Self {
        self.script.push((
            needle.to_string(),
            CommandResult {
                exit_code: code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.commands.iter().any(|c| c.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.commands.iter().filter(|c| c.contains(needle)).count()
    }

    /// Index of the first command containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.commands.iter().position(|c| c.contains(needle))
    }
}

impl RemoteSession for FakeSession {
    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        self.connects += 1;
        if self.refuse_connection {
            return Err(DeployError::Connection {
                host: "203.0.113.7".to_string(),
                reason: "Connection refused".to_string(),
            }
            .into());
        }
        self.connected = true;
        Ok(())
    }

    async fn execute(&mut self, command: &str, options: &ExecOptions) -> Result<CommandResult> {
        if !self.connected {
            return Err(DeployError::Connection {
                host: "203.0.113.7".to_string(),
                reason: "session is not connected".to_string(),
            }
            .into());
        }
        self.commands.push(command.to_string());
        let result = self
            .script
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_default();
        if !result.success() && !options.ignore_failure {
            return Err(DeployError::RemoteCommand {
                command: command.to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr,
            }
            .into());
        }
        Ok(result)
    }

    async fn upload(&mut self, contents: &[u8], remote_path: &str) -> Result<()> {
        self.uploads.push((
            remote_path.to_string(),
            String::from_utf8_lossy(contents).into_owned(),
        ));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            self.disconnects += 1;
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ── Git ──────────────────────────────────────────────────────────────────────

pub struct FakeGit {
    pub commit: String,
    pub message: String,
    pub reject_push: bool,
    pub unreadable: bool,
    pub pushes: Mutex<Vec<(String, String)>>,
}

impl FakeGit {
    pub fn at(commit: &str) -> Self {
        Self {
            commit: commit.to_string(),
            message: "Add checkout page".to_string(),
            reject_push: false,
            unreadable: false,
            pushes: Mutex::new(Vec::new()),
        }
    }

    pub fn pushes(&self) -> Vec<(String, String)> {
        self.pushes.lock().expect("lock").clone()
    }
}

impl GitGateway for FakeGit {
    async fn current_branch(&self) -> Result<String> {
        Ok("main".to_string())
    }

    async fn head_commit(&self) -> Result<String> {
        if self.unreadable {
            return Err(DeployError::LocalGit {
                operation: "rev-parse".to_string(),
                message: "fatal: not a git repository".to_string(),
            }
            .into());
        }
        Ok(self.commit.clone())
    }

    async fn head_message(&self) -> Result<String> {
        Ok(self.message.clone())
    }

    async fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.pushes
            .lock()
            .expect("lock")
            .push((remote.to_string(), branch.to_string()));
        if self.reject_push {
            return Err(DeployError::LocalGit {
                operation: "push".to_string(),
                message: "! [rejected] main -> main (non-fast-forward)".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// ── History ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryHistory {
    ledger: Mutex<HistoryLedger>,
    pub saves: Mutex<usize>,
}

impl MemoryHistory {
    /// Records given most-recent-first.
    pub fn with(records: Vec<RunRecord>) -> Self {
        Self {
            ledger: Mutex::new(HistoryLedger::from_records(records)),
            saves: Mutex::new(0),
        }
    }

    pub fn records(&self) -> Vec<RunRecord> {
        self.ledger.lock().expect("lock").records().to_vec()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().expect("lock")
    }
}

impl HistoryStore for MemoryHistory {
    async fn load(&self) -> Result<HistoryLedger> {
        Ok(self.ledger.lock().expect("lock").clone())
    }

    async fn save(&self, ledger: &HistoryLedger) -> Result<()> {
        *self.ledger.lock().expect("lock") = ledger.clone();
        *self.saves.lock().expect("lock") += 1;
        Ok(())
    }
}

pub fn record(commit: &str, status: RunStatus, minutes_ago: i64) -> RunRecord {
    RunRecord {
        branch: Some("main".to_string()),
        commit: commit.to_string(),
        message: Some(format!("commit {commit}")),
        server_commit: Some(commit.to_string()),
        status,
        error: None,
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        kind: RunKind::Deploy,
        failed_step: None,
        completed_steps: None,
    }
}

// ── Config store ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryConfigStore {
    pub saved: Mutex<Vec<DeployConfig>>,
}

impl MemoryConfigStore {
    pub fn saved(&self) -> Vec<DeployConfig> {
        self.saved.lock().expect("lock").clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<DeployConfig> {
        self.saved
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .ok_or_else(|| autodeploy_cli::domain::error::ConfigError::NotFound.into())
    }

    fn save(&self, config: &DeployConfig) -> Result<()> {
        self.saved.lock().expect("lock").push(config.clone());
        Ok(())
    }

    fn path(&self) -> PathBuf {
        PathBuf::from("deploy-config.yml")
    }

    fn exists(&self) -> bool {
        !self.saved.lock().expect("lock").is_empty()
    }
}

pub fn config(yaml: &str) -> DeployConfig {
    serde_yaml::from_str(yaml).expect("valid config yaml")
}

pub const NODE_CONFIG: &str = r"
project:
  name: shop
  type: nodejs
server:
  host: 203.0.113.7
  username: deploy
  password: hunter2
  deployPath: /var/www/shop
git:
  repository: git@example.com:acme/shop.git
  branch: main
build:
  command: npm run build
  startCommand: npm start
  port: 3000
";

// ── Reporter ─────────────────────────────────────────────────────────────────

/// Collects progress events as `"<kind>: <message>"`.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("lock").clone()
    }

    fn push(&self, kind: &str, message: &str) {
        self.events
            .lock()
            .expect("lock")
            .push(format!("{kind}: {message}"));
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.push("step", message);
    }
    fn success(&self, message: &str) {
        self.push("ok", message);
    }
    fn fail(&self, message: &str) {
        self.push("fail", message);
    }
    fn warn(&self, message: &str) {
        self.push("warn", message);
    }
}

// ── Profiles ─────────────────────────────────────────────────────────────────

pub fn profile(kind: AppKind) -> ProjectProfile {
    ProjectProfile {
        name: "shop".to_string(),
        kind,
        build: BuildDirectives {
            command: None,
            start_command: None,
            frontend_build_command: None,
            composer_install: true,
            laravel_optimize: true,
            run_migrations: false,
        },
        port: None,
        deploy_path: "/var/www/shop".to_string(),
        domain: None,
        certificate_email: None,
    }
}

pub fn node_profile(start_command: &str) -> ProjectProfile {
    let mut p = profile(AppKind::Nodejs);
    p.build.start_command = Some(start_command.to_string());
    p.port = Some(3000);
    p
}
