//! Plan builder.
//!
//! `build` is a pure function of the profile and the action: the same inputs
//! always produce the same steps in the same order. Deploy and rollback
//! plans are fail-fast apart from the php-fpm reload; provisioning installs
//! tools best-effort.

use crate::domain::history::short_commit;
use crate::domain::profile::{AppKind, ProjectProfile};
use crate::domain::step::{Action, CaptureSlot, Guard, Launch, Plan, RemoteOp, Step, StepAction};
use crate::domain::template;

/// Frontend build used for laravel-react when none is configured.
pub const DEFAULT_FRONTEND_BUILD: &str = "npm run build";

/// Build the plan for `action`.
#[must_use]
pub fn build(profile: &ProjectProfile, action: &Action) -> Plan {
    let steps = match action {
        Action::Deploy { remote, branch } => deploy_steps(profile, remote, branch),
        Action::Rollback { commit } => rollback_steps(profile, commit),
        Action::Provision { repository, branch } => provision_steps(profile, repository, branch),
        Action::AttachDomain { domain } => web_server_steps(profile, domain, true),
        Action::DetachDomain => detach_steps(profile),
        Action::RenewCertificate => vec![
            Step::remote(RemoteOp::CertbotRenew)
                .labeled("Renewing SSL certificates")
                .in_dir("/"),
        ],
    };
    Plan {
        action: action.kind(),
        kind: profile.kind,
        steps,
    }
}

fn deploy_steps(profile: &ProjectProfile, remote: &str, branch: &str) -> Vec<Step> {
    let mut steps = vec![
        Step::new(StepAction::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
        })
        .labeled(format!("Pushing {branch} to {remote}")),
        Step::remote(RemoteOp::GitPull {
            branch: branch.to_string(),
        })
        .labeled("Pulling latest changes on server"),
        Step::new(StepAction::Capture {
            op: RemoteOp::GitRevParseHead,
            slot: CaptureSlot::ServerCommit,
        }),
    ];
    if let Some(command) = &profile.build.command {
        steps.push(
            Step::remote(RemoteOp::Configured(command.clone())).labeled("Building application"),
        );
    }
    steps.extend(kind_steps(profile, true));
    steps
}

fn rollback_steps(profile: &ProjectProfile, commit: &str) -> Vec<Step> {
    let mut steps = vec![
        Step::remote(RemoteOp::GitCheckout {
            commit: commit.to_string(),
        })
        .labeled(format!("Checking out {}", short_commit(commit))),
    ];
    if let Some(command) = &profile.build.command {
        steps.push(
            Step::remote(RemoteOp::Configured(command.clone())).labeled("Rebuilding application"),
        );
    }
    steps.extend(kind_steps(profile, false));
    steps
}

/// Install, restart and reload steps for the profile's kind.
fn kind_steps(profile: &ProjectProfile, with_migrations: bool) -> Vec<Step> {
    let mut steps = Vec::new();
    match profile.kind {
        AppKind::Nodejs => {
            steps.push(
                Step::remote(RemoteOp::NpmInstall { production: true })
                    .labeled("Installing dependencies"),
            );
            steps.extend(supervisor_step(profile));
        }
        AppKind::Python | AppKind::Static => steps.extend(supervisor_step(profile)),
        AppKind::LaravelReact => {
            let build = &profile.build;
            steps.push(
                Step::remote(RemoteOp::NpmInstall { production: false })
                    .labeled("Installing frontend dependencies"),
            );
            let frontend = build
                .frontend_build_command
                .clone()
                .unwrap_or_else(|| DEFAULT_FRONTEND_BUILD.to_string());
            steps.push(
                Step::remote(RemoteOp::Configured(frontend)).labeled("Building frontend assets"),
            );
            if build.composer_install {
                steps.push(
                    Step::remote(RemoteOp::ComposerInstall)
                        .labeled("Installing Composer dependencies"),
                );
            }
            if build.laravel_optimize {
                steps.push(Step::remote(RemoteOp::ArtisanOptimize).labeled("Optimizing Laravel"));
            }
            if with_migrations && build.run_migrations {
                steps.push(
                    Step::remote(RemoteOp::ArtisanMigrate).labeled("Running database migrations"),
                );
            }
            steps.push(
                Step::new(StepAction::Capture {
                    op: RemoteOp::PhpVersion,
                    slot: CaptureSlot::RuntimeVersion,
                })
                .ignore_failure(),
            );
            steps.push(
                Step::remote(RemoteOp::ReloadPhpFpm { versioned: true })
                    .labeled("Reloading PHP-FPM")
                    .ignore_failure(),
            );
        }
        AppKind::Php => steps.push(
            Step::remote(RemoteOp::ReloadPhpFpm { versioned: false })
                .labeled("Reloading PHP-FPM")
                .ignore_failure(),
        ),
    }
    steps
}

fn supervisor_step(profile: &ProjectProfile) -> Option<Step> {
    if !profile.is_supervised() {
        return None;
    }
    let start = profile.build.start_command.as_deref()?;
    Some(
        Step::new(StepAction::EnsureProcess {
            name: profile.name.clone(),
            launch: Launch::parse(start),
        })
        .labeled("Restarting application"),
    )
}

fn provision_steps(profile: &ProjectProfile, repository: &str, branch: &str) -> Vec<Step> {
    let hooks_dir = format!("{}/hooks", profile.git_dir());
    let mut steps = vec![
        Step::remote(RemoteOp::MakeDir(profile.deploy_path.clone()))
            .labeled("Creating deploy directory"),
        install("git", RemoteOp::AptInstall(vec!["git".to_string()])).labeled("Installing git"),
        Step::remote(RemoteOp::GitClone {
            repository: repository.to_string(),
            dest: profile.deploy_path.clone(),
        })
        .labeled("Cloning repository")
        .when(Guard::PathMissing(profile.git_dir())),
        Step::remote(RemoteOp::MakeDir(profile.state_dir())),
        Step::remote(RemoteOp::MakeDir(hooks_dir)),
        Step::new(StepAction::WriteFile {
            path: profile.hook_path(),
            contents: template::post_receive_hook(profile, branch),
            executable: true,
        })
        .labeled("Setting up git hooks"),
    ];

    let needs_node = match profile.kind {
        AppKind::Nodejs | AppKind::LaravelReact => true,
        AppKind::Python | AppKind::Static => profile.is_supervised(),
        AppKind::Php => false,
    };
    if needs_node {
        steps.push(install("node", RemoteOp::InstallNodeRuntime).labeled("Installing Node.js"));
    }
    if profile.kind == AppKind::Nodejs || profile.is_supervised() {
        steps.push(
            install("pm2", RemoteOp::NpmGlobalInstall("pm2".to_string())).labeled("Installing PM2"),
        );
    }
    if profile.kind == AppKind::LaravelReact && profile.build.composer_install {
        steps.push(install("composer", RemoteOp::InstallComposer).labeled("Installing Composer"));
    }

    if let Some(domain) = &profile.domain {
        steps.extend(web_server_steps(profile, domain, false));
    }

    steps.into_iter().map(|step| step.in_dir("/")).collect()
}

/// Install step that runs only when `tool` is missing and never fails the run.
fn install(tool: &str, op: RemoteOp) -> Step {
    Step::remote(op)
        .when(Guard::ToolMissing(tool.to_string()))
        .ignore_failure()
}

/// Virtual host and certificate for `domain`.
///
/// With `strict` every step after the tool installs is fail-fast; during
/// provisioning the reload and certificate are best-effort.
fn web_server_steps(profile: &ProjectProfile, domain: &str, strict: bool) -> Vec<Step> {
    let available = template::vhost_available_path(&profile.name);
    let policy = |step: Step| if strict { step } else { step.ignore_failure() };
    vec![
        install("nginx", RemoteOp::AptInstall(vec!["nginx".to_string()]))
            .labeled("Installing Nginx"),
        Step::new(StepAction::WriteFile {
            path: available.clone(),
            contents: template::nginx_vhost(profile, domain),
            executable: false,
        })
        .labeled("Configuring Nginx"),
        Step::remote(RemoteOp::Symlink {
            target: available,
            link: template::vhost_enabled_path(&profile.name),
        }),
        policy(Step::remote(RemoteOp::NginxReload { test_first: true }).labeled("Reloading Nginx")),
        install(
            "certbot",
            RemoteOp::AptInstall(vec!["certbot".to_string(), "python3-certbot-nginx".to_string()]),
        )
        .labeled("Installing Certbot"),
        policy(
            Step::remote(RemoteOp::CertbotIssue {
                domain: domain.to_string(),
                email: profile.email_for(domain),
            })
            .labeled("Obtaining SSL certificate"),
        ),
    ]
    .into_iter()
    .map(|step| step.in_dir("/"))
    .collect()
}

fn detach_steps(profile: &ProjectProfile) -> Vec<Step> {
    vec![
        Step::remote(RemoteOp::RemoveFile(template::vhost_enabled_path(&profile.name)))
            .labeled("Disabling site")
            .in_dir("/"),
        Step::remote(RemoteOp::NginxReload { test_first: false })
            .labeled("Reloading Nginx")
            .in_dir("/"),
    ]
}
