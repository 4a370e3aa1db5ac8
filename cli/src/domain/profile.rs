//! Run-time view of the configuration: the project profile and the remote
//! target. Both are built once per invocation and never mutated.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Port the application listens on when the configuration does not say.
pub const DEFAULT_APP_PORT: u16 = 3000;

/// Application kind; selects the kind-specific part of every plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppKind {
    Nodejs,
    Php,
    LaravelReact,
    Static,
    Python,
}

impl AppKind {
    pub const ALL: [AppKind; 5] = [
        AppKind::Nodejs,
        AppKind::Php,
        AppKind::LaravelReact,
        AppKind::Static,
        AppKind::Python,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nodejs => "nodejs",
            Self::Php => "php",
            Self::LaravelReact => "laravel-react",
            Self::Static => "static",
            Self::Python => "python",
        }
    }

    /// Whether the web server proxies to an application port rather than
    /// serving files from the deploy path.
    #[must_use]
    pub fn is_proxied(self) -> bool {
        matches!(self, Self::Nodejs | Self::Python)
    }

    /// Whether requests for `.php` files are handed to php-fpm.
    #[must_use]
    pub fn uses_php_fpm(self) -> bool {
        matches!(self, Self::Php | Self::LaravelReact)
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build and start directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDirectives {
    pub command: Option<String>,
    pub start_command: Option<String>,
    pub frontend_build_command: Option<String>,
    pub composer_install: bool,
    pub laravel_optimize: bool,
    pub run_migrations: bool,
}

/// Everything the plan builder needs to know about the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectProfile {
    pub name: String,
    pub kind: AppKind,
    pub build: BuildDirectives,
    pub port: Option<u16>,
    /// Absolute path on the remote host, without a trailing slash.
    pub deploy_path: String,
    pub domain: Option<String>,
    pub certificate_email: Option<String>,
}

impl ProjectProfile {
    /// Whether the application runs as a long-lived supervised process.
    ///
    /// `nodejs`, `python` and `static` projects are supervised once a start
    /// command is configured; php-based kinds are served through php-fpm.
    #[must_use]
    pub fn is_supervised(&self) -> bool {
        self.build.start_command.is_some()
            && matches!(self.kind, AppKind::Nodejs | AppKind::Python | AppKind::Static)
    }

    #[must_use]
    pub fn upstream_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_APP_PORT)
    }

    /// Contact address for certificates issued for `domain`.
    #[must_use]
    pub fn email_for(&self, domain: &str) -> String {
        self.certificate_email
            .clone()
            .unwrap_or_else(|| format!("admin@{domain}"))
    }

    #[must_use]
    pub fn git_dir(&self) -> String {
        format!("{}/.git", self.deploy_path)
    }

    #[must_use]
    pub fn hook_path(&self) -> String {
        format!("{}/.git/hooks/post-receive", self.deploy_path)
    }

    #[must_use]
    pub fn state_dir(&self) -> String {
        format!("{}/.autodeploy", self.deploy_path)
    }

    /// Server-side marker log appended by the post-receive hook.
    #[must_use]
    pub fn marker_log(&self) -> String {
        format!("{}/deployments.log", self.state_dir())
    }
}

/// How the session authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Password(String),
    Key(PathBuf),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::Key(path) => f.debug_tuple("Key").field(path).finish(),
        }
    }
}

/// The single host a run talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: Auth,
    pub command_timeout_secs: u64,
}

impl RemoteTarget {
    /// `user@host` destination used by ssh and scp.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}
