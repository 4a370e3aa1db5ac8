//! Remote command templating.
//!
//! Every piece of shell text sent to the server is produced here, from typed
//! operations and profile fields. Values that come from configuration or the
//! user are quoted with [`shell_quote`]; the only verbatim text is the build
//! and start commands the project owner configured.

use crate::domain::profile::{AppKind, ProjectProfile};
use crate::domain::step::{CaptureSlot, Captures, Launch, RemoteOp};

/// Printed by the path-existence probe when the path exists.
pub const EXISTS_MARKER: &str = "exists";

/// Node.js major release installed during provisioning.
pub const NODE_MAJOR: u8 = 18;

pub const NGINX_AVAILABLE_DIR: &str = "/etc/nginx/sites-available";
pub const NGINX_ENABLED_DIR: &str = "/etc/nginx/sites-enabled";
pub const NGINX_ERROR_LOG: &str = "/var/log/nginx/error.log";

const PHP_VERSION_PROBE: &str = r#"php -r 'echo PHP_MAJOR_VERSION.".".PHP_MINOR_VERSION;'"#;

/// Quote `value` for a POSIX shell.
///
/// Plain words pass through unchanged so rendered commands stay readable.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@%+=,".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Prefix `command` with a change into `cwd`.
#[must_use]
pub fn in_dir(cwd: &str, command: &str) -> String {
    format!("cd {} && {command}", shell_quote(cwd))
}

/// Prints the tool's path when it is installed, nothing otherwise.
#[must_use]
pub fn tool_probe(tool: &str) -> String {
    format!("command -v {}", shell_quote(tool))
}

/// Prints [`EXISTS_MARKER`] when `path` exists.
#[must_use]
pub fn path_probe(path: &str) -> String {
    format!("test -e {} && echo {EXISTS_MARKER}", shell_quote(path))
}

#[must_use]
pub fn make_executable(path: &str) -> String {
    format!("chmod 755 {}", shell_quote(path))
}

// ── Process supervisor ───────────────────────────────────────────────────────

/// Exits zero only when a process called `name` is registered.
#[must_use]
pub fn process_describe(name: &str) -> String {
    format!("pm2 describe {}", shell_quote(name))
}

#[must_use]
pub fn process_restart(name: &str) -> String {
    format!("pm2 restart {}", shell_quote(name))
}

/// Register and start `name` according to `launch`.
#[must_use]
pub fn process_start(name: &str, launch: &Launch) -> String {
    let name = shell_quote(name);
    match launch {
        Launch::PackageScript { args } => format!("pm2 start npm --name {name} -- {args}"),
        Launch::EntryFile { path, args } => {
            let base = format!("pm2 start {} --name {name}", shell_quote(path));
            with_args(base, args.as_deref())
        }
        Launch::Launcher { program, args } => {
            let base = format!(
                "pm2 start {} --name {name} --interpreter none",
                shell_quote(program)
            );
            with_args(base, args.as_deref())
        }
    }
}

fn with_args(base: String, args: Option<&str>) -> String {
    match args {
        Some(args) => format!("{base} -- {args}"),
        None => base,
    }
}

/// Save the process list and install the boot-time resurrect unit.
#[must_use]
pub fn process_persist() -> String {
    "(pm2 startup > /dev/null 2>&1 || true) && pm2 save".to_string()
}

// ── Typed operations ─────────────────────────────────────────────────────────

impl RemoteOp {
    /// Render the operation to shell text, reading captured values where the
    /// command depends on an earlier step.
    #[must_use]
    pub fn render(&self, captures: &Captures) -> String {
        match self {
            Self::Configured(command) => command.clone(),
            Self::GitPull { branch } => format!("git pull origin {}", shell_quote(branch)),
            Self::GitRevParseHead => "git rev-parse HEAD".to_string(),
            Self::GitCheckout { commit } => format!("git checkout {}", shell_quote(commit)),
            Self::GitClone { repository, dest } => {
                format!("git clone {} {}", shell_quote(repository), shell_quote(dest))
            }
            Self::GitCurrentBranch => "git rev-parse --abbrev-ref HEAD".to_string(),
            Self::GitLastCommit => "git log -1 --pretty=format:'%h - %s (%cr)'".to_string(),
            Self::MakeDir(path) => format!("mkdir -p {}", shell_quote(path)),
            Self::Symlink { target, link } => {
                format!("ln -sf {} {}", shell_quote(target), shell_quote(link))
            }
            Self::RemoveFile(path) => format!("rm -f {}", shell_quote(path)),
            Self::AptInstall(packages) => {
                let packages: Vec<String> = packages.iter().map(|p| shell_quote(p)).collect();
                format!(
                    "apt-get update && DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
                    packages.join(" ")
                )
            }
            Self::InstallNodeRuntime => format!(
                "curl -fsSL https://deb.nodesource.com/setup_{NODE_MAJOR}.x | bash - \
                 && apt-get install -y nodejs"
            ),
            Self::InstallComposer => "curl -sS https://getcomposer.org/installer \
                 | php -- --install-dir=/usr/local/bin --filename=composer"
                .to_string(),
            Self::NpmInstall { production: true } => "npm install --production".to_string(),
            Self::NpmInstall { production: false } => "npm install".to_string(),
            Self::NpmGlobalInstall(package) => format!("npm install -g {}", shell_quote(package)),
            Self::ComposerInstall => "composer install --no-dev --optimize-autoloader".to_string(),
            Self::ArtisanOptimize => "php artisan config:cache && php artisan route:cache \
                 && php artisan view:cache"
                .to_string(),
            Self::ArtisanMigrate => "php artisan migrate".to_string(),
            Self::PhpVersion => PHP_VERSION_PROBE.to_string(),
            Self::ReloadPhpFpm { versioned } => {
                let version = captures
                    .get(CaptureSlot::RuntimeVersion)
                    .filter(|v| is_runtime_version(v));
                match version {
                    Some(v) if *versioned => format!(
                        "systemctl reload php{v}-fpm || systemctl reload php-fpm || true"
                    ),
                    _ => "systemctl reload php-fpm || true".to_string(),
                }
            }
            Self::NginxReload { test_first: true } => {
                "nginx -t && systemctl reload nginx".to_string()
            }
            Self::NginxReload { test_first: false } => "systemctl reload nginx".to_string(),
            Self::CertbotIssue { domain, email } => format!(
                "certbot --nginx -d {} --non-interactive --agree-tos --email {}",
                shell_quote(domain),
                shell_quote(email)
            ),
            Self::CertbotRenew => "certbot renew --nginx".to_string(),
            Self::CertbotExpiry { domain } => format!(
                "certbot certificates -d {} 2>/dev/null | grep 'Expiry Date'",
                shell_quote(domain)
            ),
            Self::Uptime => "uptime -p".to_string(),
            Self::MemoryUsage => "free -h | grep Mem".to_string(),
            Self::DiskUsage => "df -h / | tail -1".to_string(),
            Self::TailFile { path, lines } => format!("tail -n {lines} {}", shell_quote(path)),
            Self::ProcessList => "pm2 jlist".to_string(),
            Self::ProcessLogs { name, lines } => {
                format!("pm2 logs {} --lines {lines} --nostream", shell_quote(name))
            }
        }
    }
}

/// Only `digits.digits` is spliced into a unit name.
fn is_runtime_version(value: &str) -> bool {
    value
        .split_once('.')
        .is_some_and(|(major, minor)| is_digits(major) && is_digits(minor))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

// ── Server-side documents ────────────────────────────────────────────────────

#[must_use]
pub fn vhost_available_path(name: &str) -> String {
    format!("{NGINX_AVAILABLE_DIR}/{name}")
}

#[must_use]
pub fn vhost_enabled_path(name: &str) -> String {
    format!("{NGINX_ENABLED_DIR}/{name}")
}

/// The post-receive hook installed on the server.
///
/// It mirrors a deploy: pull, append to the marker log, build, then the
/// same describe-then-restart-or-start decision the supervisor adapter makes.
#[must_use]
pub fn post_receive_hook(profile: &ProjectProfile, branch: &str) -> String {
    let deploy_path = shell_quote(&profile.deploy_path);
    let mut script = String::new();
    script.push_str("#!/bin/bash\nset -e\n\n");
    script.push_str("echo \"[DEPLOY] Starting deployment...\"\n");
    script.push_str("unset GIT_DIR\n");
    script.push_str(&format!("cd {deploy_path}\n\n"));
    script.push_str(&format!("git pull origin {}\n\n", shell_quote(branch)));
    script.push_str(&format!("mkdir -p {}\n", shell_quote(&profile.state_dir())));
    script.push_str(&format!(
        "echo \"$(date '+%Y-%m-%d %H:%M:%S') - $(git rev-parse HEAD)\" >> {}\n",
        shell_quote(&profile.marker_log())
    ));

    if let Some(build) = &profile.build.command {
        script.push_str("\necho \"[BUILD] Building application...\"\n");
        script.push_str(build);
        script.push('\n');
    }

    if profile.kind == AppKind::Nodejs {
        script.push_str("\necho \"[INSTALL] Installing dependencies...\"\n");
        script.push_str("npm install --production\n");
    }

    if let Some(start) = profile
        .build
        .start_command
        .as_deref()
        .filter(|_| profile.is_supervised())
    {
        let launch = Launch::parse(start);
        script.push_str("\necho \"[RESTART] Restarting application...\"\n");
        script.push_str(&format!(
            "if {} > /dev/null 2>&1; then\n",
            process_describe(&profile.name)
        ));
        script.push_str(&format!("    {}\n", process_restart(&profile.name)));
        script.push_str("else\n");
        script.push_str(&format!("    {}\n", process_start(&profile.name, &launch)));
        script.push_str(&format!("    {}\n", process_persist()));
        script.push_str("fi\n");
    }

    if profile.kind.uses_php_fpm() {
        script.push_str("\necho \"[RELOAD] Reloading PHP-FPM...\"\n");
        script.push_str("systemctl reload php-fpm || true\n");
    }

    script.push_str("\necho \"[SUCCESS] Deployment completed successfully!\"\n");
    script
}

/// The nginx virtual host for `domain`.
#[must_use]
pub fn nginx_vhost(profile: &ProjectProfile, domain: &str) -> String {
    let mut conf = String::new();
    conf.push_str("server {\n");
    conf.push_str("    listen 80;\n");
    conf.push_str(&format!("    server_name {domain};\n\n"));

    if profile.kind.is_proxied() {
        conf.push_str("    location / {\n");
        conf.push_str(&format!(
            "        proxy_pass http://localhost:{};\n",
            profile.upstream_port()
        ));
        conf.push_str("        proxy_http_version 1.1;\n");
        conf.push_str("        proxy_set_header Upgrade $http_upgrade;\n");
        conf.push_str("        proxy_set_header Connection 'upgrade';\n");
        conf.push_str("        proxy_set_header Host $host;\n");
        conf.push_str("        proxy_set_header X-Real-IP $remote_addr;\n");
        conf.push_str("        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;\n");
        conf.push_str("        proxy_set_header X-Forwarded-Proto $scheme;\n");
        conf.push_str("        proxy_cache_bypass $http_upgrade;\n");
        conf.push_str("    }\n");
    } else {
        let root = match profile.kind {
            AppKind::LaravelReact => format!("{}/public", profile.deploy_path),
            _ => profile.deploy_path.clone(),
        };
        conf.push_str(&format!("    root {root};\n"));
        conf.push_str("    index index.html index.php;\n\n");
        conf.push_str("    location / {\n");
        conf.push_str("        try_files $uri $uri/ /index.php?$query_string;\n");
        conf.push_str("    }\n");

        if profile.kind.uses_php_fpm() {
            conf.push_str("\n    location ~ \\.php$ {\n");
            conf.push_str("        fastcgi_pass unix:/var/run/php/php-fpm.sock;\n");
            conf.push_str("        fastcgi_index index.php;\n");
            conf.push_str(
                "        fastcgi_param SCRIPT_FILENAME $document_root$fastcgi_script_name;\n",
            );
            conf.push_str("        include fastcgi_params;\n");
            conf.push_str("    }\n");
        }
    }

    conf.push_str("}\n");
    conf
}
