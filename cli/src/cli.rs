//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Push, provision and restart an application on a single remote host
#[derive(Parser)]
#[command(
    name = "autodeploy",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Answer yes to confirmations
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Log every remote command to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Configure the project and prepare the server
    Init,

    /// Push the current branch and deploy it
    Deploy(commands::deploy::DeployArgs),

    /// Show server, application and deployment status
    Status,

    /// Return to an earlier successful deployment
    #[command(disable_version_flag = true)]
    Rollback(commands::rollback::RollbackArgs),

    /// Manage the domain and its certificate
    Domain(commands::domain::DomainArgs),

    /// Show deployment, application and web server logs
    Logs(commands::logs::LogsArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color: self.no_color,
                quiet: self.quiet,
                json: self.json,
            },
            behaviour: BehaviourFlags { yes: self.yes },
        });

        match self.command {
            Command::Init => commands::init::run(&app).await,
            Command::Deploy(args) => commands::deploy::run(&app, &args).await,
            Command::Status => commands::status::run(&app).await,
            Command::Rollback(args) => commands::rollback::run(&app, &args).await,
            Command::Domain(args) => commands::domain::run(&app, &args).await,
            Command::Logs(args) => commands::logs::run(&app, &args).await,
        }
    }
}
