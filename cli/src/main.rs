//! autodeploy - push, provision and restart an application on a remote host

use clap::Parser;
use tracing_subscriber::EnvFilter;

use autodeploy_cli::cli::Cli;
use autodeploy_cli::output::json::{error_code, format_error};

/// Log filter, e.g. `AUTODEPLOY_LOG=autodeploy_cli=debug`.
const LOG_ENV: &str = "AUTODEPLOY_LOG";

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    if let Err(e) = cli.run().await {
        if json {
            match format_error(&format!("{e:#}"), error_code(&e)) {
                Ok(obj) => println!("{obj}"),
                Err(_) => eprintln!("Error: {e:#}"),
            }
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}
