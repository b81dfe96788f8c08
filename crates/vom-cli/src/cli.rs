use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vom",
    about = "Vim object model: run ex commands against a persistent session",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with leader keys and window defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Session file to resume from and save to
    #[arg(short, long, global = true)]
    pub session: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run ex commands in order
    Exec(ExecArgs),
    /// Read ex commands from stdin until :q or end of input
    Repl(ReplArgs),
    /// Show what a session file contains
    Inspect(InspectArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ExecArgs {
    /// Ex command lines, e.g. "set nowrap" or ":let g:x = 1"
    #[arg(short = 'c', long = "cmd", required = true)]
    pub commands: Vec<String>,
    /// Stop at the first failing command
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct ReplArgs {}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ConfigArgs {}
