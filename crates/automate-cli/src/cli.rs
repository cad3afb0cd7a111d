use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line arguments for the automate CLI
#[derive(Debug, Parser)]
#[command(
    name = "automate",
    version,
    about = "Turns infrastructure requests into reviewed Ansible, Bash or PowerShell automation"
)]
pub struct Cli {
    /// Configuration file [default: ~/.automate/config.toml]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Research, plan, review and generate automation for a request
    Run {
        /// Natural-language automation request
        request: String,

        /// Use this text as research instead of the knowledge repository
        #[arg(long)]
        research: Option<String>,

        /// Directory the generated file is written to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Classify incidents (one per line) and roll their categories up into a small parent taxonomy
    Categorize {
        /// File holding one incident record per line
        file: PathBuf,

        /// Treat each line as an existing category label and skip classification
        #[arg(long)]
        labels: bool,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
