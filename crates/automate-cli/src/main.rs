//! Automate CLI - request-to-automation pipeline front end
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

use std::io;

use anyhow::Result;
use clap::Parser as _;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

mod cli;
mod handlers;

/// Installs the stderr log subscriber; `RUST_LOG` wins over the config.
fn init_logging(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig { force } => {
            init_logging("info");
            handlers::handle_init_config(cli.config, force)
        }
        Command::Run {
            request,
            research,
            output,
        } => {
            let config = handlers::load_config(cli.config.as_deref())?;
            init_logging(config.log_filter());
            handlers::handle_run(&config, &request, research, &output).await
        }
        Command::Categorize { file, labels } => {
            let config = handlers::load_config(cli.config.as_deref())?;
            init_logging(config.log_filter());
            if labels {
                handlers::handle_categorize_labels(&config, &file).await
            } else {
                handlers::handle_categorize(&config, &file).await
            }
        }
    }
}
