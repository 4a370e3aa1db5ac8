//! Step and plan model.
//!
//! Steps are stateless descriptions: typed operations plus a label and a
//! failure policy. Command text is produced only by `domain::template`.

use crate::domain::profile::AppKind;

/// What happens when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the remaining plan and propagate the error.
    FailFast,
    /// Log the failure and continue with the next step.
    Ignore,
}

/// Named slot a step can write its trimmed stdout into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSlot {
    /// Commit checked out on the server after the pull.
    ServerCommit,
    /// `major.minor` of the server's PHP runtime.
    RuntimeVersion,
}

/// Values captured while a plan runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    server_commit: Option<String>,
    runtime_version: Option<String>,
}

impl Captures {
    #[must_use]
    pub fn get(&self, slot: CaptureSlot) -> Option<&str> {
        match slot {
            CaptureSlot::ServerCommit => self.server_commit.as_deref(),
            CaptureSlot::RuntimeVersion => self.runtime_version.as_deref(),
        }
    }

    /// Store `value` in `slot`; blank values clear the slot.
    pub fn set(&mut self, slot: CaptureSlot, value: &str) {
        let value = Some(value.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        match slot {
            CaptureSlot::ServerCommit => self.server_commit = value,
            CaptureSlot::RuntimeVersion => self.runtime_version = value,
        }
    }

    #[must_use]
    pub fn server_commit(&self) -> Option<&str> {
        self.get(CaptureSlot::ServerCommit)
    }
}

/// Precondition probed before a step runs. When it does not hold the step
/// completes without running its command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Run only when `command -v <tool>` prints nothing.
    ToolMissing(String),
    /// Run only when the remote path does not exist.
    PathMissing(String),
}

/// How the process supervisor should launch the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// `npm <args>`, run through npm so package scripts resolve.
    PackageScript { args: String },
    /// `node <path> [args]`, handed to the supervisor as a script file.
    EntryFile { path: String, args: Option<String> },
    /// Any other launcher binary with its arguments.
    Launcher { program: String, args: Option<String> },
}

impl Launch {
    /// Classify a configured start command.
    #[must_use]
    pub fn parse(start_command: &str) -> Self {
        let command = start_command.trim();
        let (program, rest) = match command.split_once(char::is_whitespace) {
            Some((program, rest)) => (program, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (command, None),
        };
        match (program, rest) {
            ("npm", Some(args)) => Self::PackageScript {
                args: args.to_string(),
            },
            ("node", Some(rest)) => {
                let (path, args) = match rest.split_once(char::is_whitespace) {
                    Some((path, args)) => (path, Some(args.trim().to_string())),
                    None => (rest, None),
                };
                Self::EntryFile {
                    path: path.to_string(),
                    args,
                }
            }
            (program, args) => Self::Launcher {
                program: program.to_string(),
                args: args.map(str::to_owned),
            },
        }
    }
}

/// Typed remote operations. Rendered to shell text by `domain::template`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    /// A command taken verbatim from the project configuration.
    Configured(String),
    GitPull { branch: String },
    GitRevParseHead,
    GitCheckout { commit: String },
    GitClone { repository: String, dest: String },
    GitCurrentBranch,
    GitLastCommit,
    MakeDir(String),
    Symlink { target: String, link: String },
    RemoveFile(String),
    AptInstall(Vec<String>),
    InstallNodeRuntime,
    InstallComposer,
    NpmInstall { production: bool },
    NpmGlobalInstall(String),
    ComposerInstall,
    ArtisanOptimize,
    ArtisanMigrate,
    PhpVersion,
    /// Reload php-fpm, preferring the versioned unit when a runtime version
    /// was captured.
    ReloadPhpFpm { versioned: bool },
    NginxReload { test_first: bool },
    CertbotIssue { domain: String, email: String },
    CertbotRenew,
    CertbotExpiry { domain: String },
    Uptime,
    MemoryUsage,
    DiskUsage,
    TailFile { path: String, lines: u32 },
    ProcessList,
    ProcessLogs { name: String, lines: u32 },
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Push the local branch; runs before any remote step.
    Push { remote: String, branch: String },
    Remote(RemoteOp),
    /// Run `op` and store its stdout in `slot`.
    Capture { op: RemoteOp, slot: CaptureSlot },
    /// Start-or-restart the named process through the supervisor adapter.
    EnsureProcess { name: String, launch: Launch },
    /// Upload `contents` to `path` on the remote host.
    WriteFile {
        path: String,
        contents: String,
        executable: bool,
    },
}

impl StepAction {
    /// Whether the step needs the remote session.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Push { .. })
    }
}

/// One ordered unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// User-visible progress label; unlabeled steps run silently.
    pub label: Option<String>,
    pub action: StepAction,
    pub policy: FailurePolicy,
    pub guard: Option<Guard>,
    /// Remote working directory; `None` means the deploy path.
    pub cwd: Option<String>,
}

impl Step {
    #[must_use]
    pub fn new(action: StepAction) -> Self {
        Self {
            label: None,
            action,
            policy: FailurePolicy::FailFast,
            guard: None,
            cwd: None,
        }
    }

    #[must_use]
    pub fn remote(op: RemoteOp) -> Self {
        Self::new(StepAction::Remote(op))
    }

    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn ignore_failure(mut self) -> Self {
        self.policy = FailurePolicy::Ignore;
        self
    }

    #[must_use]
    pub fn when(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    #[must_use]
    pub fn in_dir(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Label used in logs and failure records.
    #[must_use]
    pub fn describe(&self) -> String {
        self.label.clone().unwrap_or_else(|| format!("{:?}", self.action))
    }
}

/// The action a plan is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Deploy { remote: String, branch: String },
    Rollback { commit: String },
    Provision { repository: String, branch: String },
    AttachDomain { domain: String },
    DetachDomain,
    RenewCertificate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Deploy,
    Rollback,
    Provision,
    AttachDomain,
    DetachDomain,
    RenewCertificate,
}

impl Action {
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Deploy { .. } => ActionKind::Deploy,
            Self::Rollback { .. } => ActionKind::Rollback,
            Self::Provision { .. } => ActionKind::Provision,
            Self::AttachDomain { .. } => ActionKind::AttachDomain,
            Self::DetachDomain => ActionKind::DetachDomain,
            Self::RenewCertificate => ActionKind::RenewCertificate,
        }
    }
}

/// Ordered steps for one run of one project kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub action: ActionKind,
    pub kind: AppKind,
    pub steps: Vec<Step>,
}

impl Plan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
